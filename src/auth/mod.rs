//! Room key gate for the API.
//!
//! A game room can be closed to outsiders by configuring a shared key. This
//! does not identify players; anyone holding the key may act under any name.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, ErrorResponse};

/// Header carrying the room key.
pub const ROOM_KEY_HEADER: &str = "x-room-key";

/// Middleware rejecting requests that do not present the configured room key.
pub async fn room_key_layer(expected: Option<String>, request: Request, next: Next) -> Response {
    // No key configured: the room is open
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    match presented_key(request.headers()) {
        Some(key) if keys_match(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid room key"),
        None => unauthorized_response("Missing room key"),
    }
}

/// Key from the room key header, falling back to a bearer token.
fn presented_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ROOM_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(str::to_string)
}

/// Constant-time key comparison.
fn keys_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    let error = AppError::Unauthorized(message.to_string());
    (error.status_code(), Json(ErrorResponse::new(&error, 0))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("party-night", "party-night"));
        assert!(!keys_match("party-night", "party-nighT"));
        assert!(!keys_match("short", "much-longer-key"));
        assert!(keys_match("", ""));
    }

    #[test]
    fn test_presented_key_prefers_room_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ROOM_KEY_HEADER, HeaderValue::from_static("from-header"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(presented_key(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_presented_key_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(presented_key(&headers).as_deref(), Some("from-bearer"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(presented_key(&headers), None);
    }
}
