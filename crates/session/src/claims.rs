//! Session token claims

use serde::{Deserialize, Serialize};

/// Claims carried by a session token. Stateless verification material —
/// the durable record of the session lives in the `SessionRepository`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject this token resolves to
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}
