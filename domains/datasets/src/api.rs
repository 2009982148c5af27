//! Thin HTTP surface over the Dataset Tracker, mirroring the teacher's
//! domain-owned routes/handlers/state split.

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use phylo_common::Error;
use phylo_session::{RequiredSession, Session, SessionBackend};

use crate::access::DatasetOwnerLookup;
use crate::entity::{Dataset, DatasetPatch, DatasetType, NewDataset};
use crate::repository::DatasetRepository;

#[derive(Clone)]
pub struct DatasetsState {
    pub repo: Arc<dyn DatasetRepository>,
    pub session: SessionBackend,
}

impl FromRef<DatasetsState> for SessionBackend {
    fn from_ref(state: &DatasetsState) -> Self {
        state.session.clone()
    }
}

pub fn routes() -> Router<DatasetsState> {
    Router::new()
        .route("/v1/datasets", get(list_datasets).post(upload_dataset))
        .route(
            "/v1/datasets/{id}",
            get(get_dataset).patch(update_dataset).delete(delete_dataset),
        )
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub dataset_type: String,
    /// Sequence/tree content, as text (FASTA/Nexus are text formats).
    pub content: String,
}

async fn owner_lookup(state: &DatasetsState) -> DatasetOwnerLookup {
    DatasetOwnerLookup::new(state.repo.clone())
}

async fn upload_dataset(
    State(state): State<DatasetsState>,
    session: Session,
    Json(req): Json<UploadRequest>,
) -> Result<axum::response::Response, Error> {
    let dataset_type = DatasetType::parse(&req.dataset_type)
        .ok_or_else(|| Error::Validation(format!("unknown dataset type: {}", req.dataset_type)))?;

    let new = NewDataset {
        name: req.name,
        description: req.description,
        dataset_type,
        content: req.content.into_bytes(),
    };

    let dataset = state.repo.store(new, Some(session.subject())).await?;
    let response = (StatusCode::CREATED, Json(dataset)).into_response();
    Ok(session.apply(response))
}

async fn list_datasets(
    State(state): State<DatasetsState>,
    RequiredSession(subject): RequiredSession,
) -> Result<Json<Vec<Dataset>>, Error> {
    let datasets = state.repo.list_by_owner(Some(&subject)).await?;
    Ok(Json(datasets))
}

async fn get_dataset(
    State(state): State<DatasetsState>,
    RequiredSession(subject): RequiredSession,
    Path(id): Path<String>,
) -> Result<Json<Dataset>, Error> {
    let lookup = owner_lookup(&state).await;
    state
        .session
        .check_access(&subject, &id, &lookup)
        .await
        .map_err(Error::from)?;

    let dataset = state
        .repo
        .get(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("dataset {id} not found")))?;
    Ok(Json(dataset))
}

async fn update_dataset(
    State(state): State<DatasetsState>,
    RequiredSession(subject): RequiredSession,
    Path(id): Path<String>,
    Json(patch): Json<DatasetPatch>,
) -> Result<Json<Dataset>, Error> {
    let lookup = owner_lookup(&state).await;
    state
        .session
        .check_access(&subject, &id, &lookup)
        .await
        .map_err(Error::from)?;

    let dataset = state
        .repo
        .update(&id, patch)
        .await?
        .ok_or_else(|| Error::NotFound(format!("dataset {id} not found")))?;
    Ok(Json(dataset))
}

async fn delete_dataset(
    State(state): State<DatasetsState>,
    RequiredSession(subject): RequiredSession,
    Path(id): Path<String>,
) -> Result<StatusCode, Error> {
    let lookup = owner_lookup(&state).await;
    state
        .session
        .check_access(&subject, &id, &lookup)
        .await
        .map_err(Error::from)?;

    state.repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
