//! Session cookie.
//!
//! `session_token` carries the refresh token: httpOnly, path `/`, expiring
//! with the session. It is not marked `Secure` and has no `SameSite`
//! attribute; deployments behind TLS should tighten this.

use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

/// Cookie name for the refresh token.
pub const SESSION_COOKIE: &str = "session_token";

fn to_offset(instant: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(instant.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Build the session cookie for `refresh_token`, expiring at `expires_at`.
pub fn session_cookie(refresh_token: &str, expires_at: DateTime<Utc>) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), refresh_token.to_string()))
        .http_only(true)
        .path("/".to_string())
        .expires(to_offset(expires_at))
        .build()
}

/// Build an already-expired session cookie.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), String::new()))
        .http_only(true)
        .path("/".to_string())
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}
