//! Dataset Tracker (C2): content-addressed, per-owner dataset storage.

mod access;
pub mod api;
mod entity;
mod repository;

pub use access::DatasetOwnerLookup;
pub use api::{routes, DatasetsState};
pub use entity::{Dataset, DatasetPatch, DatasetType, NewDataset};
pub use repository::{DatasetRepository, InMemoryDatasetRepository, PgDatasetRepository};
