//! Admin session gate.
//!
//! Sessions are stateless signed cookies:
//! `printshop_session=<nonce>.<issued_unix>.<hex hmac-sha256(secret, "<nonce>.<issued_unix>")>`.
//! Nothing is stored server-side; a cookie is valid while its tag verifies and
//! it is younger than `max_age`. Logout only clears the browser cookie.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "printshop_session";
pub const LOGIN_PATH: &str = "/login";

/// Cookies issued slightly in the future (clock skew between replicas) are
/// still accepted up to this many seconds.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

const PASSWORD_TAG_CONTEXT: &[u8] = b"admin-password:";

type HmacSha256 = Hmac<Sha256>;

/// Proof that the request carried a valid admin session cookie.
///
/// Only obtainable from [`SessionGate::verify`] (or the axum extractor), so
/// holding one is the authorization check for admin desk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSession {
    issued_at: i64,
}

impl AdminSession {
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    #[cfg(test)]
    pub(crate) const fn for_tests() -> Self {
        Self { issued_at: 0 }
    }
}

/// Issues and verifies admin session cookies.
#[derive(Clone)]
pub struct SessionGate {
    mac: HmacSha256,
    password_tag: Vec<u8>,
    max_age_secs: i64,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("mac", &"<REDACTED>")
            .field("password_tag", &"<REDACTED>")
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

impl SessionGate {
    pub fn new(secret: &str, admin_password: &str, max_age: Duration) -> anyhow::Result<Self> {
        if secret.is_empty() {
            bail!("session secret is empty");
        }
        if admin_password.is_empty() {
            bail!("admin password is empty");
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .context("session secret rejected as hmac key")?;
        let password_tag = password_tag(&mac, admin_password);
        Ok(Self {
            mac,
            password_tag,
            max_age_secs: i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
        })
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    /// Constant-time comparison: both sides are reduced to HMAC tags and the
    /// tag check is done by `verify_slice`.
    pub fn check_password(&self, candidate: &str) -> bool {
        let mut mac = self.mac.clone();
        mac.update(PASSWORD_TAG_CONTEXT);
        mac.update(candidate.as_bytes());
        mac.verify_slice(&self.password_tag).is_ok()
    }

    /// New cookie value issued at `now_unix`.
    pub fn issue(&self, now_unix: i64) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        let payload = format!("{nonce}.{now_unix}");
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        format!("{payload}.{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Validate a cookie value. `None` for anything malformed, forged or expired.
    pub fn verify(&self, value: &str, now_unix: i64) -> Option<AdminSession> {
        let (payload, tag_hex) = value.rsplit_once('.')?;
        let (nonce, issued_raw) = payload.split_once('.')?;
        if nonce.is_empty() {
            return None;
        }
        let issued_at: i64 = issued_raw.parse().ok()?;
        let tag = hex::decode(tag_hex).ok()?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag).ok()?;

        let age = now_unix.saturating_sub(issued_at);
        if age < -MAX_CLOCK_SKEW_SECS || age > self.max_age_secs {
            return None;
        }
        Some(AdminSession { issued_at })
    }

    /// `Set-Cookie` value for a freshly issued session.
    pub fn set_cookie(&self, value: &str) -> String {
        format!(
            "{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.max_age_secs
        )
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear_cookie() -> String {
        format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
    }

    /// Session carried by `headers`, if any is valid at `now_unix`.
    pub fn session_from_headers(&self, headers: &HeaderMap, now_unix: i64) -> Option<AdminSession> {
        session_cookie_value(headers).and_then(|v| self.verify(v, now_unix))
    }
}

fn password_tag(mac: &HmacSha256, password: &str) -> Vec<u8> {
    let mut mac = mac.clone();
    mac.update(PASSWORD_TAG_CONTEXT);
    mac.update(password.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// First `printshop_session` value across all `Cookie` headers.
pub fn session_cookie_value(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
        .next()
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let now = chrono::Utc::now().timestamp();
        state
            .gate
            .session_from_headers(&parts.headers, now)
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}
