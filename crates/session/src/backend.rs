//! Concrete Session Service backend
//!
//! Wraps a `SessionRepository` plus the signing key and config. Domain
//! states expose this via `FromRef`, the same nested-state pattern used
//! for every other cross-cutting backend in this workspace:
//! ```ignore
//! impl FromRef<JobsState> for SessionBackend {
//!     fn from_ref(state: &JobsState) -> Self {
//!         state.session.clone()
//!     }
//! }
//! ```

use std::sync::Arc;

use axum::http::request::Parts;

use crate::access::OwnerLookup;
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::jwt::{extract_token_from_parts, sign_token, validate_token};
use crate::repository::SessionRepository;

/// The outcome of resolving a request to a subject: the subject itself,
/// plus the freshly minted token to surface as `X-Session-Token` when a
/// new session had to be created.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub subject: String,
    pub new_token: Option<String>,
}

#[derive(Clone)]
pub struct SessionBackend {
    repo: Arc<dyn SessionRepository>,
    key: Arc<String>,
    config: SessionConfig,
}

impl SessionBackend {
    pub fn new(repo: Arc<dyn SessionRepository>, key: String, config: SessionConfig) -> Self {
        Self {
            repo,
            key: Arc::new(key),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// `get_or_create_subject`: never fails. On a valid token, resolves
    /// and bumps `last_seen`; otherwise mints a new Subject and token.
    pub async fn get_or_create_subject(&self, parts: &Parts) -> Result<Resolved, AuthError> {
        if let Some(token) = extract_token_from_parts(parts) {
            if let Ok(claims) = validate_token(&token, &self.key) {
                self.repo.touch(&claims.sub).await?;
                return Ok(Resolved {
                    subject: claims.sub,
                    new_token: None,
                });
            }
        }

        let subject = uuid::Uuid::new_v4().to_string();
        self.repo.create(&subject).await?;
        let token = sign_token(&subject, &self.key, self.config.token_lifetime_secs);

        tracing::debug!(subject = %subject, "minted new session");

        Ok(Resolved {
            subject,
            new_token: Some(token),
        })
    }

    /// `get_subject`: same extraction, but errors instead of minting.
    pub async fn get_subject(&self, parts: &Parts) -> Result<String, AuthError> {
        let token = extract_token_from_parts(parts).ok_or(AuthError::Unauthorized)?;
        let claims = validate_token(&token, &self.key)?;
        self.repo.touch(&claims.sub).await?;
        Ok(claims.sub)
    }

    /// `check_{job,dataset}_access`: resolve ownership of `id` against
    /// `lookup`, granting access if the record is public (no owner) and
    /// denying it if the resolved subject isn't the owner.
    pub async fn check_access(
        &self,
        subject: &str,
        id: &str,
        lookup: &dyn OwnerLookup,
    ) -> Result<(), AuthError> {
        match lookup.get_owner(id).await? {
            None => Err(AuthError::NotFound(id.to_string())),
            Some(None) => Ok(()),
            Some(Some(owner)) if owner == subject => Ok(()),
            Some(Some(_)) => Err(AuthError::Forbidden(id.to_string())),
        }
    }

    /// Delete a subject's session row. Cascading deletes of owned
    /// datasets/jobs are the responsibility of those repositories.
    pub async fn delete_subject(&self, subject: &str) -> Result<(), AuthError> {
        self.repo.delete(subject).await?;
        Ok(())
    }

    /// One GC sweep: remove idle subjects, returning the removed ids so
    /// the caller can cascade deletes into owned datasets/jobs.
    pub async fn gc_sweep(&self) -> Result<Vec<String>, AuthError> {
        let removed = self.repo.gc_idle(self.config.max_idle_secs).await?;
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "session GC removed idle subjects");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemorySessionRepository;
    use axum::http::Request;

    fn test_backend() -> SessionBackend {
        SessionBackend::new(
            Arc::new(InMemorySessionRepository::new()),
            "test-key".to_string(),
            SessionConfig {
                key_path: String::new(),
                token_lifetime_secs: 3600,
                max_idle_secs: 60,
                gc_interval_secs: 10,
            },
        )
    }

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/jobs");
        if let Some(t) = token {
            builder = builder.header(axum::http::header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_get_or_create_mints_on_missing_token() {
        let backend = test_backend();
        let resolved = backend
            .get_or_create_subject(&parts_with_token(None))
            .await
            .unwrap();
        assert!(resolved.new_token.is_some());
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_valid_token() {
        let backend = test_backend();
        let first = backend
            .get_or_create_subject(&parts_with_token(None))
            .await
            .unwrap();
        let token = first.new_token.unwrap();

        let second = backend
            .get_or_create_subject(&parts_with_token(Some(&token)))
            .await
            .unwrap();
        assert_eq!(second.subject, first.subject);
        assert!(second.new_token.is_none());
    }

    #[tokio::test]
    async fn test_get_subject_rejects_missing_token() {
        let backend = test_backend();
        let result = backend.get_subject(&parts_with_token(None)).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_get_subject_accepts_valid_token() {
        let backend = test_backend();
        let minted = backend
            .get_or_create_subject(&parts_with_token(None))
            .await
            .unwrap();
        let token = minted.new_token.unwrap();

        let subject = backend
            .get_subject(&parts_with_token(Some(&token)))
            .await
            .unwrap();
        assert_eq!(subject, minted.subject);
    }

    struct StubLookup(Option<Option<String>>);

    #[async_trait::async_trait]
    impl OwnerLookup for StubLookup {
        async fn get_owner(&self, _id: &str) -> Result<Option<Option<String>>, phylo_common::Error> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_check_access_grants_public_records() {
        let backend = test_backend();
        let lookup = StubLookup(Some(None));
        assert!(backend.check_access("s1", "rec", &lookup).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_access_grants_matching_owner() {
        let backend = test_backend();
        let lookup = StubLookup(Some(Some("s1".to_string())));
        assert!(backend.check_access("s1", "rec", &lookup).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_access_denies_mismatched_owner() {
        let backend = test_backend();
        let lookup = StubLookup(Some(Some("s2".to_string())));
        let result = backend.check_access("s1", "rec", &lookup).await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_check_access_propagates_not_found() {
        let backend = test_backend();
        let lookup = StubLookup(None);
        let result = backend.check_access("s1", "rec", &lookup).await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }
}
