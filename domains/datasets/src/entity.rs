//! Dataset entity and validation
//!
//! A dataset is a content-addressed blob plus metadata. Its `id` is a
//! pure function of `(content, owner_subject)`: the same owner uploading
//! identical content twice is idempotent; a different owner uploading
//! the same content gets a distinct id while sharing the same
//! `content_hash`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use phylo_common::{dataset_id, Error};

/// Dataset type accepted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "dataset_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Fasta,
    Nexus,
    Fas,
}

impl DatasetType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "fasta" => Some(DatasetType::Fasta),
            "nexus" => Some(DatasetType::Nexus),
            "fas" => Some(DatasetType::Fas),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DatasetType::Fasta => "fasta",
            DatasetType::Nexus => "nexus",
            DatasetType::Fas => "fas",
        };
        write!(f, "{s}")
    }
}

/// A stored dataset. `raw_bytes` is never populated by the metadata-only
/// query paths (`get`, `list_by_owner`) and is never serialized in API
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub content_hash: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub owner_subject: Option<String>,
    #[serde(skip)]
    pub raw_bytes: Option<Vec<u8>>,
}

/// Caller-supplied fields for a new upload, before `id`/`content_hash`
/// are derived.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub description: Option<String>,
    pub dataset_type: DatasetType,
    pub content: Vec<u8>,
}

impl NewDataset {
    /// Pre-store validation: non-empty name and content; `type` must
    /// already have parsed into `DatasetType`, so only emptiness is
    /// checked here.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }
        if self.content.is_empty() {
            return Err(Error::Validation("content must not be empty".to_string()));
        }
        Ok(())
    }

    /// Derive the content-addressed `id` and `content_hash` for `owner`
    /// (empty string for public/ownerless datasets) and build the full
    /// `Dataset` record as it would be freshly inserted.
    pub fn into_dataset(self, owner_subject: Option<&str>) -> Dataset {
        let owner_key = owner_subject.unwrap_or("");
        let id = dataset_id(&self.content, owner_key);
        let content_hash = phylo_common::content_hash(&self.content);
        let now = Utc::now();

        Dataset {
            id,
            content_hash,
            name: self.name,
            description: self.description,
            dataset_type: self.dataset_type,
            created: now,
            updated: now,
            owner_subject: owner_subject.map(str::to_string),
            raw_bytes: Some(self.content),
        }
    }
}

/// Patch for `update`: only metadata fields may change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_dataset(content: &[u8]) -> NewDataset {
        NewDataset {
            name: "alignment-a".to_string(),
            description: None,
            dataset_type: DatasetType::Fasta,
            content: content.to_vec(),
        }
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let mut d = new_dataset(b"ACGT");
        d.name = "  ".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_content() {
        let d = new_dataset(b"");
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_input() {
        let d = new_dataset(b"ACGT");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_id_deterministic_for_same_owner() {
        let a = new_dataset(b"ACGT").into_dataset(Some("s1"));
        let b = new_dataset(b"ACGT").into_dataset(Some("s1"));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_id_differs_across_owners_same_content_hash() {
        let a = new_dataset(b"ACGT").into_dataset(Some("s1"));
        let b = new_dataset(b"ACGT").into_dataset(Some("s2"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_dataset_type_parse_is_case_insensitive() {
        assert_eq!(DatasetType::parse("FASTA"), Some(DatasetType::Fasta));
        assert_eq!(DatasetType::parse("nexus"), Some(DatasetType::Nexus));
        assert_eq!(DatasetType::parse("bogus"), None);
    }
}
