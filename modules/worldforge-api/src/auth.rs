//! HMAC-signed cookie sessions for the per-user world routes.
//!
//! The OAuth dance that identifies the user happens elsewhere; this module
//! only issues and verifies the signed session cookie that carries the
//! resulting user id.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const COOKIE_NAME: &str = "wf_session";
const SESSION_DURATION_SECS: i64 = 7 * 24 * 3600; // 7 days

/// Authenticated user session. Extract this in handlers that require auth;
/// a missing or invalid cookie rejects with 401 before the handler runs.
pub struct UserSession {
    pub user_id: String,
}

impl FromRequestParts<Arc<AppState>> for UserSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if let Some(value) = parse_cookie(cookie_header, COOKIE_NAME) {
            if let Some(user_id) = verify_session(value, &state.config.session_secret) {
                return Ok(UserSession { user_id });
            }
        }

        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    user_id: String,
    password: String,
}

/// Issue a session cookie. Stands in for the external OAuth callback: the
/// shared password gates who may mint sessions.
pub async fn api_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    if !constant_time_eq(
        req.password.as_bytes(),
        state.config.admin_password.as_bytes(),
    ) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response();
    }
    if !is_safe_user_id(&req.user_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid user id" })),
        )
            .into_response();
    }

    let cookie = session_cookie(&req.user_id, &state.config.session_secret);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response()
}

pub async fn api_logout() -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response()
}

/// Create a signed session cookie value: `user_id|expiry|signature`
pub fn create_session(user_id: &str, secret: &str) -> String {
    let expiry = chrono::Utc::now().timestamp() + SESSION_DURATION_SECS;
    let payload = format!("{user_id}|{expiry}");
    let sig = sign(&payload, secret);
    format!("{payload}|{sig}")
}

/// Build the Set-Cookie header value.
/// In release builds, adds `Secure` to prevent transmission over HTTP.
pub fn session_cookie(user_id: &str, secret: &str) -> String {
    let value = create_session(user_id, secret);
    let secure = if cfg!(debug_assertions) { "" } else { "; Secure" };
    format!(
        "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_DURATION_SECS}{secure}"
    )
}

/// Build a Set-Cookie header that clears the session.
pub fn clear_session_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Verify a session cookie value. Returns the user id if valid.
fn verify_session(value: &str, secret: &str) -> Option<String> {
    let parts: Vec<&str> = value.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let user_id = parts[0];
    let expiry_str = parts[1];
    let sig = parts[2];

    let payload = format!("{user_id}|{expiry_str}");
    let expected_sig = sign(&payload, secret);
    if !constant_time_eq(sig.as_bytes(), expected_sig.as_bytes()) {
        return None;
    }

    let expiry: i64 = expiry_str.parse().ok()?;
    if chrono::Utc::now().timestamp() > expiry {
        return None;
    }

    Some(user_id.to_string())
}

/// User ids become directory names under the saves root, so they are held
/// to the same character set as filenames.
pub fn is_safe_user_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Parse a specific cookie from the Cookie header string.
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_session() {
        let secret = "test-secret-key";
        let user = "google-104283";
        let cookie_value = create_session(user, secret);
        assert_eq!(verify_session(&cookie_value, secret), Some(user.to_string()));
    }

    #[test]
    fn rejects_tampered_session() {
        let secret = "test-secret-key";
        let cookie_value = create_session("google-104283", secret);
        let tampered = cookie_value.replacen("google-104283", "google-999999", 1);
        assert_eq!(verify_session(&tampered, secret), None);
    }

    #[test]
    fn rejects_wrong_secret() {
        let cookie_value = create_session("google-104283", "secret-a");
        assert_eq!(verify_session(&cookie_value, "secret-b"), None);
    }

    #[test]
    fn rejects_expired_session() {
        let user = "google-104283";
        let secret = "test-secret";
        let expiry = chrono::Utc::now().timestamp() - 100;
        let payload = format!("{user}|{expiry}");
        let sig = sign(&payload, secret);
        let value = format!("{payload}|{sig}");
        assert_eq!(verify_session(&value, secret), None);
    }

    #[test]
    fn parse_cookie_works() {
        assert_eq!(
            parse_cookie("wf_session=abc123; other=xyz", "wf_session"),
            Some("abc123")
        );
        assert_eq!(
            parse_cookie("other=xyz; wf_session=abc123", "wf_session"),
            Some("abc123")
        );
        assert_eq!(parse_cookie("other=xyz", "wf_session"), None);
    }

    #[test]
    fn user_ids_are_restricted_to_directory_safe_names() {
        assert!(is_safe_user_id("google-104283"));
        assert!(is_safe_user_id("alice_2"));
        assert!(!is_safe_user_id(""));
        assert!(!is_safe_user_id("../etc"));
        assert!(!is_safe_user_id("a/b"));
    }
}
