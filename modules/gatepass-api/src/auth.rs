use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use gatepass_common::{GatePassError, User};

use crate::rest::ApiError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const COOKIE_NAME: &str = "gp_session";
const SESSION_DURATION_SECS: i64 = 8 * 3600; // one shift

/// The authenticated caller, resolved from the session cookie to their users
/// row. Extract this in every handler that needs an identity; a missing or
/// invalid session rejects with 401 before the handler runs.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let Some(value) = parse_cookie(cookie_header, COOKIE_NAME) else {
            return Err(GatePassError::Authentication.into());
        };
        let Some(email) = verify_session(value, &state.config.session_secret) else {
            return Err(GatePassError::Authentication.into());
        };

        let user = state
            .engine
            .user_by_email(&email)
            .await?
            .ok_or(GatePassError::Authentication)?;

        Ok(CurrentUser(user))
    }
}

#[derive(Deserialize)]
pub struct SessionRequest {
    name: String,
    email: String,
}

/// The identity-provider callback edge: the provider's backend posts the
/// verified principal here with the shared secret. Upserts the user by email
/// (each login refreshes the name) and issues the session cookie.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provided = headers
        .get("x-idp-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !constant_time_eq(
        provided.as_bytes(),
        state.config.idp_shared_secret.as_bytes(),
    ) {
        return Err(GatePassError::Authentication.into());
    }

    let name = body.name.trim();
    let email = body.email.trim();
    if name.is_empty() || email.is_empty() || !email.contains('@') {
        return Err(GatePassError::Validation("name and a valid email are required".into()).into());
    }

    let user = state.engine.upsert_user(name, email).await?;
    let cookie = session_cookie(&user.email, &state.config.session_secret);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "user": { "id": user.id, "name": user.name, "email": user.email }
        })),
    ))
}

pub async fn end_session() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        StatusCode::NO_CONTENT,
    )
}

/// Create a signed session cookie value: `email|expiry|signature`
pub fn create_session(email: &str, secret: &str) -> String {
    let expiry = chrono::Utc::now().timestamp() + SESSION_DURATION_SECS;
    let payload = format!("{email}|{expiry}");
    let sig = sign(&payload, secret);
    format!("{payload}|{sig}")
}

/// Build the Set-Cookie header value.
/// In release builds, adds `Secure` to prevent transmission over HTTP.
pub fn session_cookie(email: &str, secret: &str) -> String {
    let value = create_session(email, secret);
    let secure = if cfg!(debug_assertions) { "" } else { "; Secure" };
    format!(
        "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_DURATION_SECS}{secure}"
    )
}

/// Build a Set-Cookie header that clears the session.
pub fn clear_session_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Verify a session cookie value. Returns the email if valid.
fn verify_session(value: &str, secret: &str) -> Option<String> {
    let parts: Vec<&str> = value.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let email = parts[0];
    let expiry_str = parts[1];
    let sig = parts[2];

    let payload = format!("{email}|{expiry_str}");
    let expected_sig = sign(&payload, secret);
    if !constant_time_eq(sig.as_bytes(), expected_sig.as_bytes()) {
        return None;
    }

    let expiry: i64 = expiry_str.parse().ok()?;
    if chrono::Utc::now().timestamp() > expiry {
        return None;
    }

    Some(email.to_string())
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
        let email = "carol@plant.example";
        let cookie_value = create_session(email, secret);
        let result = verify_session(&cookie_value, secret);
        assert_eq!(result, Some(email.to_string()));
    }

    #[test]
    fn rejects_tampered_session() {
        let secret = "test-secret-key";
        let cookie_value = create_session("carol@plant.example", secret);
        let tampered = cookie_value.replacen("carol", "mallory", 1);
        assert_eq!(verify_session(&tampered, secret), None);
    }

    #[test]
    fn rejects_wrong_secret() {
        let cookie_value = create_session("carol@plant.example", "secret-a");
        assert_eq!(verify_session(&cookie_value, "secret-b"), None);
    }

    #[test]
    fn rejects_expired_session() {
        let email = "carol@plant.example";
        let secret = "test-secret";
        let expiry = chrono::Utc::now().timestamp() - 100;
        let payload = format!("{email}|{expiry}");
        let sig = sign(&payload, secret);
        let value = format!("{payload}|{sig}");
        assert_eq!(verify_session(&value, secret), None);
    }

    #[test]
    fn parse_cookie_works() {
        assert_eq!(
            parse_cookie("gp_session=abc123; other=xyz", "gp_session"),
            Some("abc123")
        );
        assert_eq!(
            parse_cookie("other=xyz; gp_session=abc123", "gp_session"),
            Some("abc123")
        );
        assert_eq!(parse_cookie("other=xyz", "gp_session"), None);
    }
}
