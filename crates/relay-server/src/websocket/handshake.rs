//! Credential extraction from the WebSocket upgrade request.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

/// Header carrying the raw token.
pub const TOKEN_HEADER: &str = "access_token";

/// Query parameters accepted as the token, in lookup order.
pub const TOKEN_QUERY_PARAMS: [&str; 2] = ["access_token", "token"];

/// Find the access token in a handshake.
///
/// Lookup order: `access_token` header, `Authorization: Bearer` header,
/// then the `access_token` / `token` query parameters. Empty values are
/// skipped.
pub fn extract_token(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    let header_token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(token) = header_token {
        return Some(token.to_string());
    }

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    TOKEN_QUERY_PARAMS
        .iter()
        .filter_map(|name| query.get(*name))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
