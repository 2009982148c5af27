//! Thin HTTP surface over the Job Tracker/Facade (C3/C6), plus the public
//! method registry (C5's descriptor feed is internal; this is C3's own
//! `GET /methods`).

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use phylo_common::Error;
use phylo_session::{RequiredSession, SessionBackend};

use crate::facade::{JobFacade, JobView, Submission};
use crate::method::{MethodDescriptor, MethodParams, MethodType};

#[derive(Clone)]
pub struct JobsState {
    pub facade: std::sync::Arc<JobFacade>,
    pub session: SessionBackend,
}

impl FromRef<JobsState> for SessionBackend {
    fn from_ref(state: &JobsState) -> Self {
        state.session.clone()
    }
}

pub fn routes() -> Router<JobsState> {
    Router::new()
        .route("/v1/methods", get(list_methods))
        .route("/v1/jobs", axum::routing::post(submit_job))
        .route("/v1/jobs/{id}", get(get_job).delete(cancel_job))
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    method: String,
    alignment_id: String,
    tree_id: Option<String>,
    #[serde(default)]
    params: MethodParams,
}

async fn list_methods() -> Json<Vec<MethodDescriptor>> {
    Json(MethodType::all().iter().map(|m| m.descriptor()).collect())
}

async fn submit_job(
    State(state): State<JobsState>,
    RequiredSession(subject): RequiredSession,
    Json(req): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<Submission>), Error> {
    let method = MethodType::parse(&req.method)
        .ok_or_else(|| Error::Validation(format!("unknown method: {}", req.method)))?;

    let submission = state
        .facade
        .submit_job(
            &subject,
            method,
            req.params,
            &req.alignment_id,
            req.tree_id.as_deref(),
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(submission)))
}

async fn get_job(
    State(state): State<JobsState>,
    RequiredSession(subject): RequiredSession,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, Error> {
    let view = state.facade.get_job(&subject, &job_id).await?;
    Ok(Json(view))
}

async fn cancel_job(
    State(state): State<JobsState>,
    RequiredSession(subject): RequiredSession,
    Path(job_id): Path<String>,
) -> Result<StatusCode, Error> {
    state.facade.cancel_job(&subject, &job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_request_defaults_params_when_omitted() {
        let req: SubmitJobRequest = serde_json::from_value(json!({
            "method": "fel",
            "alignment_id": "a1",
        }))
        .unwrap();
        assert!(req.params.0.is_empty());
    }
}
