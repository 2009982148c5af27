//! Ownership-check primitive shared by the Dataset Tracker and Job Tracker
//!
//! C1 doesn't know about datasets or jobs; each tracker implements
//! `OwnerLookup` over its own store and hands it to `SessionBackend::check_access`.

use async_trait::async_trait;
use phylo_common::Error;

/// Resolves a record id to its owner. `Ok(None)` means the record doesn't
/// exist at all; `Ok(Some(None))` means it exists and is public (no owner);
/// `Ok(Some(Some(subject)))` means it exists and is owned.
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    async fn get_owner(&self, id: &str) -> Result<Option<Option<String>>, Error>;
}
