//! Shared utilities, configuration, and error handling for the phylo core
//!
//! This crate provides common functionality used across the job-orchestration
//! service: 12-factor configuration loading, the shared error taxonomy, and
//! the content-hash helpers that derive dataset and job ids.

pub mod config;
pub mod crypto;
pub mod error;

pub use config::Config;
pub use crypto::{content_hash, dataset_id, job_id, load_or_create_key, sha256_hex};
pub use error::{Error, Result};
