//! Adapter letting the Session Service consult dataset ownership without
//! depending on this crate.

use std::sync::Arc;

use async_trait::async_trait;

use phylo_common::Error;
use phylo_session::OwnerLookup;

use crate::repository::DatasetRepository;

pub struct DatasetOwnerLookup {
    repo: Arc<dyn DatasetRepository>,
}

impl DatasetOwnerLookup {
    pub fn new(repo: Arc<dyn DatasetRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl OwnerLookup for DatasetOwnerLookup {
    async fn get_owner(&self, id: &str) -> Result<Option<Option<String>>, Error> {
        self.repo.get_owner(id).await
    }
}
