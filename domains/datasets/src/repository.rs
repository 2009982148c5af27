//! Dataset storage: content-addressed upsert, ownership-scoped reads.

use async_trait::async_trait;
use chrono::Utc;

use phylo_common::Error;

use crate::entity::{Dataset, DatasetPatch, DatasetType, NewDataset};

#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Insert `new` for `owner_subject`, deriving its content-addressed
    /// id. Storing the same content for the same owner twice is a
    /// no-op that returns the existing row unchanged.
    async fn store(
        &self,
        new: NewDataset,
        owner_subject: Option<&str>,
    ) -> Result<Dataset, Error>;

    /// Fetch a dataset's metadata (never `raw_bytes`).
    async fn get(&self, id: &str) -> Result<Option<Dataset>, Error>;

    /// Fetch a dataset's content bytes, for job submission.
    async fn get_content(&self, id: &str) -> Result<Option<Vec<u8>>, Error>;

    async fn list_by_owner(&self, owner_subject: Option<&str>) -> Result<Vec<Dataset>, Error>;

    async fn update(&self, id: &str, patch: DatasetPatch) -> Result<Option<Dataset>, Error>;

    async fn delete(&self, id: &str) -> Result<(), Error>;

    /// `None` = no such dataset; `Some(None)` = exists, no owner (public);
    /// `Some(Some(subject))` = exists, owned by `subject`.
    async fn get_owner(&self, id: &str) -> Result<Option<Option<String>>, Error>;
}

pub struct PgDatasetRepository {
    pool: sqlx::PgPool,
}

impl PgDatasetRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DatasetRow {
    id: String,
    content_hash: String,
    name: String,
    description: Option<String>,
    dataset_type: String,
    created: chrono::DateTime<Utc>,
    updated: chrono::DateTime<Utc>,
    owner_subject: Option<String>,
}

impl DatasetRow {
    fn into_dataset(self) -> Dataset {
        Dataset {
            id: self.id,
            content_hash: self.content_hash,
            name: self.name,
            description: self.description,
            dataset_type: DatasetType::parse(&self.dataset_type).unwrap_or(DatasetType::Fasta),
            created: self.created,
            updated: self.updated,
            owner_subject: self.owner_subject,
            raw_bytes: None,
        }
    }
}

#[async_trait]
impl DatasetRepository for PgDatasetRepository {
    async fn store(&self, new: NewDataset, owner_subject: Option<&str>) -> Result<Dataset, Error> {
        new.validate()?;
        let content = new.content.clone();
        let dataset = new.into_dataset(owner_subject);

        let row: DatasetRow = sqlx::query_as(
            r#"
            INSERT INTO datasets (id, content_hash, name, description, dataset_type, created, updated, owner_subject, raw_content)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET updated = datasets.updated
            RETURNING id, content_hash, name, description, dataset_type, created, updated, owner_subject
            "#,
        )
        .bind(&dataset.id)
        .bind(&dataset.content_hash)
        .bind(&dataset.name)
        .bind(&dataset.description)
        .bind(dataset.dataset_type.to_string())
        .bind(dataset.created)
        .bind(dataset.updated)
        .bind(&dataset.owner_subject)
        .bind(&content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into_dataset())
    }

    async fn get(&self, id: &str) -> Result<Option<Dataset>, Error> {
        let row: Option<DatasetRow> = sqlx::query_as(
            "SELECT id, content_hash, name, description, dataset_type, created, updated, owner_subject FROM datasets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DatasetRow::into_dataset))
    }

    async fn get_content(&self, id: &str) -> Result<Option<Vec<u8>>, Error> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT raw_content FROM datasets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(bytes,)| bytes))
    }

    async fn list_by_owner(&self, owner_subject: Option<&str>) -> Result<Vec<Dataset>, Error> {
        let rows: Vec<DatasetRow> = sqlx::query_as(
            "SELECT id, content_hash, name, description, dataset_type, created, updated, owner_subject FROM datasets WHERE owner_subject IS NOT DISTINCT FROM $1 ORDER BY created DESC",
        )
        .bind(owner_subject)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DatasetRow::into_dataset).collect())
    }

    async fn update(&self, id: &str, patch: DatasetPatch) -> Result<Option<Dataset>, Error> {
        let current = self.get(id).await?;
        let Some(current) = current else { return Ok(None) };
        let name = patch.name.unwrap_or(current.name);
        let description = patch.description.or(current.description);

        let row: Option<DatasetRow> = sqlx::query_as(
            r#"
            UPDATE datasets SET name = $2, description = $3, updated = NOW()
            WHERE id = $1
            RETURNING id, content_hash, name, description, dataset_type, created, updated, owner_subject
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DatasetRow::into_dataset))
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_owner(&self, id: &str) -> Result<Option<Option<String>>, Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT owner_subject FROM datasets WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(owner,)| owner))
    }
}

/// In-memory `DatasetRepository`, used for tests and for exercising the
/// core without a live Postgres instance.
pub struct InMemoryDatasetRepository {
    datasets: tokio::sync::RwLock<std::collections::HashMap<String, Dataset>>,
}

impl InMemoryDatasetRepository {
    pub fn new() -> Self {
        Self {
            datasets: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryDatasetRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatasetRepository for InMemoryDatasetRepository {
    async fn store(&self, new: NewDataset, owner_subject: Option<&str>) -> Result<Dataset, Error> {
        new.validate()?;
        let dataset = new.into_dataset(owner_subject);
        let mut datasets = self.datasets.write().await;
        let existing = datasets.get(&dataset.id).cloned();
        let entry = match existing {
            Some(existing) => existing,
            None => {
                datasets.insert(dataset.id.clone(), dataset.clone());
                dataset
            }
        };
        Ok(entry)
    }

    async fn get(&self, id: &str) -> Result<Option<Dataset>, Error> {
        Ok(self.datasets.read().await.get(id).map(|d| Dataset {
            raw_bytes: None,
            ..d.clone()
        }))
    }

    async fn get_content(&self, id: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .datasets
            .read()
            .await
            .get(id)
            .and_then(|d| d.raw_bytes.clone()))
    }

    async fn list_by_owner(&self, owner_subject: Option<&str>) -> Result<Vec<Dataset>, Error> {
        Ok(self
            .datasets
            .read()
            .await
            .values()
            .filter(|d| d.owner_subject.as_deref() == owner_subject)
            .map(|d| Dataset {
                raw_bytes: None,
                ..d.clone()
            })
            .collect())
    }

    async fn update(&self, id: &str, patch: DatasetPatch) -> Result<Option<Dataset>, Error> {
        let mut datasets = self.datasets.write().await;
        let Some(dataset) = datasets.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            dataset.name = name;
        }
        if let Some(description) = patch.description {
            dataset.description = Some(description);
        }
        dataset.updated = Utc::now();
        Ok(Some(Dataset {
            raw_bytes: None,
            ..dataset.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        self.datasets.write().await.remove(id);
        Ok(())
    }

    async fn get_owner(&self, id: &str) -> Result<Option<Option<String>>, Error> {
        Ok(self
            .datasets
            .read()
            .await
            .get(id)
            .map(|d| d.owner_subject.clone()))
    }
}
