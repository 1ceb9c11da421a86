//! Cookie-based login state. The session is a typed struct carried in a
//! signed cookie: base64url JSON payload plus a hex SHA-256 MAC keyed by
//! the configured secret. Absence or tampering on a protected route
//! resolves to a redirect to the login page, not an error.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::http::error::AppError;
use crate::http::AppState;

pub const SESSION_COOKIE: &str = "rollcall_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_name: String,
    pub is_instructor: bool,
}

fn mac(secret: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `Set-Cookie` value establishing the session.
pub fn issue_cookie(secret: &str, session: &Session) -> String {
    // An unencodable session falls back to an empty payload, which never
    // verifies; the user just lands back on the login page.
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(session).unwrap_or_default());
    let sig = mac(secret, &payload);
    format!("{}={}.{}; Path=/; HttpOnly", SESSION_COOKIE, payload, sig)
}

/// `Set-Cookie` value clearing all session state unconditionally.
pub fn clear_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        SESSION_COOKIE
    )
}

/// Verify a `Cookie` header value and recover the session, if any.
pub fn verify(secret: &str, cookie_header: &str) -> Option<Session> {
    let value = cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))?;
    let (payload, sig) = value.rsplit_once('.')?;
    if mac(secret, payload) != sig {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| verify(&state.session_secret, h))
            .ok_or(AppError::Auth)
    }
}
