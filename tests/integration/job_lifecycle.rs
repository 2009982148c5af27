//! End-to-end coverage of the Job Tracker/Facade/Status Monitor over
//! HTTP (S3, S4, S6, invariants 3, 4, 6, 7).

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use phylo_datasets::{DatasetRepository, DatasetType, InMemoryDatasetRepository, NewDataset};
use phylo_jobs::{InMemoryJobRepository, JobFacade, JobRepository, JobStatus, JobsState};
use phylo_scheduler::mock::{MockOutcome, MockSchedulerAdapter};
use phylo_scheduler::SchedulerAdapter;
use phylo_session::{InMemorySessionRepository, SessionBackend, SessionConfig};

fn test_session_backend() -> SessionBackend {
    SessionBackend::new(
        Arc::new(InMemorySessionRepository::new()),
        "test-key".to_string(),
        SessionConfig {
            key_path: String::new(),
            token_lifetime_secs: 3600,
            max_idle_secs: 60,
            gc_interval_secs: 3600,
        },
    )
}

struct Fixture {
    app: axum::Router,
    jobs: Arc<dyn JobRepository>,
    scheduler: Arc<MockSchedulerAdapter>,
    alignment_id: String,
    token: String,
}

async fn fixture() -> Fixture {
    let jobs: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let datasets: Arc<dyn DatasetRepository> = Arc::new(InMemoryDatasetRepository::new());
    let scheduler = Arc::new(MockSchedulerAdapter::new());
    let scheduler_dyn: Arc<dyn SchedulerAdapter> = scheduler.clone();

    let dir = std::env::temp_dir().join(format!("phylo-it-{}", uuid_like()));
    tokio::fs::create_dir_all(&dir).await.unwrap();

    let facade = Arc::new(JobFacade::new(jobs.clone(), datasets.clone(), scheduler_dyn, dir));
    let session = test_session_backend();

    let resolved = session
        .get_or_create_subject(
            &axum::http::Request::builder()
                .body(())
                .unwrap()
                .into_parts()
                .0,
        )
        .await
        .unwrap();
    let token = resolved.new_token.unwrap();

    let alignment = datasets
        .store(
            NewDataset {
                name: "alignment".to_string(),
                description: None,
                dataset_type: DatasetType::Fasta,
                content: b"ACGT".to_vec(),
            },
            Some(&resolved.subject),
        )
        .await
        .unwrap();

    let state = JobsState { facade, session };
    let app = phylo_jobs::routes().with_state(state);

    Fixture {
        app,
        jobs,
        scheduler,
        alignment_id: alignment.id,
        token,
    }
}

fn uuid_like() -> String {
    format!("{:x}", std::time::SystemTime::now().elapsed().unwrap_or_default().as_nanos())
}

async fn submit(app: &axum::Router, token: &str, alignment_id: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/jobs")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "method": "fel",
                "alignment_id": alignment_id,
                "params": { "ci": true, "srv": false },
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_s3_deterministic_job_submission() {
    let f = fixture().await;

    let (status1, first) = submit(&f.app, &f.token, &f.alignment_id).await;
    let (status2, second) = submit(&f.app, &f.token, &f.alignment_id).await;

    assert_eq!(status1, StatusCode::ACCEPTED);
    assert_eq!(status2, StatusCode::ACCEPTED);
    assert_eq!(first["job_id"], second["job_id"]);
    assert_eq!(f.scheduler.submit_call_count(), 1);
}

#[tokio::test]
async fn test_s4_status_reconciliation_never_demotes_from_terminal() {
    let f = fixture().await;
    f.scheduler.behavior().set_settle_delay_ms(0);
    f.scheduler.behavior().set_outcome(MockOutcome::Complete);

    let (_, submission) = submit(&f.app, &f.token, &f.alignment_id).await;
    let job_id = submission["job_id"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(20)).await;
    phylo_jobs::monitor::spawn(f.jobs.clone(), f.scheduler.clone(), 1).abort();
    let tick = async {
        let open = f.jobs.list_by_statuses(&[JobStatus::Pending, JobStatus::Running]).await.unwrap();
        for job in open {
            let live = f.scheduler.get_status(&job.scheduler_job_id).await.unwrap();
            f.jobs.update_status(&job.job_id, JobStatus::from(live)).await.unwrap();
        }
    };
    tick.await;

    assert_eq!(f.jobs.get_metadata(&job_id).await.unwrap().status, JobStatus::Complete);

    f.scheduler.behavior().set_outcome(MockOutcome::Fail);
    let open = f.jobs.list_by_statuses(&[JobStatus::Pending, JobStatus::Running]).await.unwrap();
    assert!(open.is_empty(), "completed job must not be re-observed as open");
    assert_eq!(f.jobs.get_metadata(&job_id).await.unwrap().status, JobStatus::Complete);
}

#[tokio::test]
async fn test_s6_cancel_removes_mapping_on_success() {
    let f = fixture().await;
    let (_, submission) = submit(&f.app, &f.token, &f.alignment_id).await;
    let job_id = submission["job_id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/jobs/{job_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {}", f.token))
        .body(Body::empty())
        .unwrap();
    let response = f.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/jobs/{job_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {}", f.token))
        .body(Body::empty())
        .unwrap();
    let response = f.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invariant_6_forbidden_for_non_owner() {
    let f = fixture().await;
    let (_, submission) = submit(&f.app, &f.token, &f.alignment_id).await;
    let job_id = submission["job_id"].as_str().unwrap().to_string();

    let other_session = test_session_backend();
    let other = other_session
        .get_or_create_subject(
            &axum::http::Request::builder()
                .body(())
                .unwrap()
                .into_parts()
                .0,
        )
        .await
        .unwrap();

    // `other` was minted against a separate session backend, so it can't
    // resolve against `f.app`'s state over HTTP; exercise the repository's
    // ownership check directly instead.
    let err = f
        .jobs
        .get_scheduler_id(&job_id, Some(&other.subject))
        .await
        .unwrap_err();
    assert!(matches!(err, phylo_common::Error::Forbidden(_)));
}
