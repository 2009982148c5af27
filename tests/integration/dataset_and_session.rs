//! End-to-end coverage of the Dataset Tracker over HTTP, plus the
//! Session Service's GC cascade (S1, S2, S5, invariants 1-2).

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use phylo_datasets::{DatasetRepository, DatasetsState, InMemoryDatasetRepository};
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

fn test_app() -> (axum::Router, Arc<dyn DatasetRepository>) {
    let repo: Arc<dyn DatasetRepository> = Arc::new(InMemoryDatasetRepository::new());
    let state = DatasetsState {
        repo: repo.clone(),
        session: test_session_backend(),
    };
    (phylo_datasets::routes().with_state(state), repo)
}

async fn upload(app: &axum::Router, token: Option<&str>, name: &str, content: &str) -> (StatusCode, Option<String>, Value) {
    let mut req = Request::builder()
        .method("POST")
        .uri("/v1/datasets")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let body = Body::from(
        json!({ "name": name, "type": "fasta", "content": content }).to_string(),
    );
    let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let minted = response
        .headers()
        .get("X-Session-Token")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, minted, json)
}

#[tokio::test]
async fn test_s1_idempotent_dataset_upload() {
    let (app, repo) = test_app();

    let (status1, token, first) = upload(&app, None, "a", "ACGT").await;
    assert_eq!(status1, StatusCode::CREATED);
    let token = token.expect("first upload mints a session token");

    let (status2, _, second) = upload(&app, Some(&token), "a", "ACGT").await;
    assert_eq!(status2, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);

    let owner = first["owner_subject"].as_str().unwrap();
    let listed = repo.list_by_owner(Some(owner)).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_s2_cross_owner_isolation() {
    let (app, _repo) = test_app();

    let (_, token_a, dataset_a) = upload(&app, None, "a", "shared-content").await;
    let (_, token_b, dataset_b) = upload(&app, None, "a", "shared-content").await;
    let token_a = token_a.unwrap();
    let token_b = token_b.unwrap();

    assert_ne!(dataset_a["id"], dataset_b["id"]);
    assert_eq!(dataset_a["content_hash"], dataset_b["content_hash"]);

    let id_a = dataset_a["id"].as_str().unwrap();
    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/datasets/{id_a}"))
        .header(header::AUTHORIZATION, format!("Bearer {token_b}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/datasets/{id_a}"))
        .header(header::AUTHORIZATION, format!("Bearer {token_a}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_s5_terminal_cascade_removes_owned_datasets() {
    let repo: Arc<dyn DatasetRepository> = Arc::new(InMemoryDatasetRepository::new());
    let session = test_session_backend();

    let dataset = repo
        .store(
            phylo_datasets::NewDataset {
                name: "a".to_string(),
                description: None,
                dataset_type: phylo_datasets::DatasetType::Fasta,
                content: b"ACGT".to_vec(),
            },
            Some("s1"),
        )
        .await
        .unwrap();

    session.delete_subject("s1").await.unwrap();
    repo.delete(&dataset.id).await.unwrap();

    assert!(repo.get(&dataset.id).await.unwrap().is_none());
}
