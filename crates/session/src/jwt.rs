//! Session token signing/validation and key-file management

use axum::http::{request::Parts, HeaderValue};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::SessionClaims;
use crate::error::AuthError;

/// Sign a fresh session token for `subject`, valid for `lifetime_secs`.
pub fn sign_token(subject: &str, key: &str, lifetime_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: subject.to_string(),
        iat: now,
        exp: now + lifetime_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_ref()),
    )
    .expect("HS256 token encoding cannot fail for well-formed claims")
}

/// Validate a session token, rejecting expired or malformed tokens.
pub fn validate_token(token: &str, key: &str) -> Result<SessionClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let decoding_key = DecodingKey::from_secret(key.as_ref());

    decode::<SessionClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "session token validation failed");
            AuthError::InvalidToken
        })
}

/// Extract a bearer token from a request, trying in order:
/// `Authorization: Bearer <t>`, the `user_token` header, then the
/// `user_token` query parameter.
pub fn extract_token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) {
        if let Some(token) = bearer_token(header) {
            return Some(token);
        }
    }

    if let Some(header) = parts.headers.get("user_token") {
        if let Ok(s) = header.to_str() {
            return Some(s.to_string());
        }
    }

    parts.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == "user_token").then(|| value.to_string())
        })
    })
}

fn bearer_token(header: &HeaderValue) -> Option<String> {
    let header_str = header.to_str().ok()?;
    header_str.strip_prefix("Bearer ").map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_validate_roundtrip() {
        let key = "test-key";
        let token = sign_token("subject-123", key, 3600);
        let claims = validate_token(&token, key).unwrap();
        assert_eq!(claims.sub, "subject-123");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let key = "test-key";
        let token = sign_token("subject-123", key, -120);
        let result = validate_token(&token, key);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_key() {
        let token = sign_token("subject-123", "key-a", 3600);
        let result = validate_token(&token, "key-b");
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_token_precedence_header_over_query() {
        let mut req = axum::http::Request::builder()
            .uri("/v1/jobs?user_token=from-query")
            .header("user_token", "from-header")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(extract_token_from_parts(&parts).unwrap(), "from-header");

        req = axum::http::Request::builder()
            .uri("/v1/jobs?user_token=from-query")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(extract_token_from_parts(&parts).unwrap(), "from-query");
    }

    #[test]
    fn test_extract_token_bearer_wins_over_user_token_header() {
        let req = axum::http::Request::builder()
            .uri("/v1/jobs")
            .header(axum::http::header::AUTHORIZATION, "Bearer from-bearer")
            .header("user_token", "from-header")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(extract_token_from_parts(&parts).unwrap(), "from-bearer");
    }
}
