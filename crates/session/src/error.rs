//! Session Service errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Session Service error. `Unauthorized` covers a missing or invalid token
/// on an endpoint that must not silently mint a session (`get_subject`);
/// `Forbidden` covers a valid subject that doesn't own the resource it
/// reached for (`check_{job,dataset}_access`).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session token required")]
    Unauthorized,

    #[error("invalid or expired session token")]
    InvalidToken,

    #[error("not the owner of {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("session backend error: {0}")]
    Backend(#[from] phylo_common::Error),
}

impl From<AuthError> for phylo_common::Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized | AuthError::InvalidToken => {
                phylo_common::Error::Unauthorized(err.to_string())
            }
            AuthError::Forbidden(id) => phylo_common::Error::Forbidden(id),
            AuthError::NotFound(id) => phylo_common::Error::NotFound(id),
            AuthError::Backend(e) => e,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Backend(e) = self {
            return e.into_response();
        }

        let (status, code) = match &self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AuthError::Backend(_) => unreachable!(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
