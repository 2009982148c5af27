//! Content-addressing helpers shared across the core
//!
//! Both the Dataset Tracker and the Job Tracker derive their primary keys
//! from a SHA-256 hash of caller-supplied bytes. These helpers centralize
//! that so the hash construction can't drift between call sites.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Load a symmetric signing key from `path`, generating and persisting a
/// fresh random one on first run. Shared by the Session Service (session
/// tokens) and the Scheduler Adapter (HTTP backend credential) so key
/// provisioning doesn't drift between the two.
pub fn load_or_create_key(path: &str) -> std::io::Result<String> {
    let path = Path::new(path);

    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(trimmed);
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let key = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    std::fs::write(path, &key)?;
    Ok(key)
}

/// `hex(sha256(bytes))`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Dataset id: `hex(sha256(content || owner))`. `owner` is the empty string
/// for public (ownerless) datasets, matching the "owner-less jobs are
/// public" convention used for jobs.
pub fn dataset_id(content: &[u8], owner: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher.update(owner.as_bytes());
    hex::encode(hasher.finalize())
}

/// Dataset content hash: `hex(sha256(content))`, independent of owner —
/// two owners uploading identical bytes get the same `content_hash` but
/// distinct dataset ids.
pub fn content_hash(content: &[u8]) -> String {
    sha256_hex(content)
}

/// Logical job id: `hex(sha256(normalized_command))`. Deterministic and
/// owner-independent — two requests with the same fully-qualified command
/// collapse to the same job id regardless of who submitted them.
pub fn job_id(normalized_command: &str) -> String {
    sha256_hex(normalized_command.as_bytes())
}
