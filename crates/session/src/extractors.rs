//! Axum extractors for the Session Service
//!
//! Generic over any state `S` where `SessionBackend: FromRef<S>` — axum's
//! nested-state pattern, same as every other cross-cutting backend here.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::backend::{Resolved, SessionBackend};
use crate::error::AuthError;

/// `get_or_create_subject`: never rejects. Carries the minted token (if
/// any) so the handler can attach it to the response as `X-Session-Token`.
#[derive(Debug)]
pub struct Session(pub Resolved);

impl<S> FromRequestParts<S> for Session
where
    SessionBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let backend = SessionBackend::from_ref(state);
        let resolved = backend.get_or_create_subject(parts).await?;
        Ok(Session(resolved))
    }
}

impl Session {
    pub fn subject(&self) -> &str {
        &self.0.subject
    }

    /// Attach `X-Session-Token` to `response` if this request minted a
    /// new session. Call from handlers that use the `Session` extractor.
    pub fn apply(&self, mut response: axum::response::Response) -> axum::response::Response {
        if let Some(token) = &self.0.new_token {
            if let Ok(value) = axum::http::HeaderValue::from_str(token) {
                response.headers_mut().insert("X-Session-Token", value);
            }
        }
        response
    }
}

/// `get_subject`: rejects with `AuthError::Unauthorized` when no valid
/// token is present. Used by endpoints that must not silently mint a
/// session (list, delete, cancel).
#[derive(Debug)]
pub struct RequiredSession(pub String);

impl<S> FromRequestParts<S> for RequiredSession
where
    SessionBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let backend = SessionBackend::from_ref(state);
        let subject = backend.get_subject(parts).await?;
        Ok(RequiredSession(subject))
    }
}
