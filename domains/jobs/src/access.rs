//! Adapter letting the Session Service consult job ownership without
//! depending on this crate.

use std::sync::Arc;

use async_trait::async_trait;

use phylo_common::Error;
use phylo_session::OwnerLookup;

use crate::repository::JobRepository;

pub struct JobOwnerLookup {
    repo: Arc<dyn JobRepository>,
}

impl JobOwnerLookup {
    pub fn new(repo: Arc<dyn JobRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl OwnerLookup for JobOwnerLookup {
    async fn get_owner(&self, id: &str) -> Result<Option<Option<String>>, Error> {
        self.repo.get_owner(id).await
    }
}
