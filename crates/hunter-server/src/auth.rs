//! Connection credential checks for the chat endpoint.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Credential presented by a connecting client: an `Authorization: Bearer` header, or a
/// `token` query parameter for browser clients that cannot set headers.
pub fn presented_credential(headers: &HeaderMap, token_param: Option<&str>) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());

    bearer
        .or(token_param.filter(|t| !t.is_empty()))
        .map(str::to_string)
}

/// Compares SHA-256 digests so the comparison length never depends on the secret.
pub fn credential_matches(presented: &str, expected: &SecretString) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.expose_secret().as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
