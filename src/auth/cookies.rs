// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted browser cookies: the session identifier, the pending login
//! `state` and a one-shot flash message.
//!
//! All cookies go through `PrivateCookieJar`, keyed from `SECRET_KEY`.

use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use axum_extra::extract::PrivateCookieJar;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::store::SessionId;

pub const SESSION_COOKIE_NAME: &str = "appid_session";
pub const STATE_COOKIE_NAME: &str = "appid_oauth_state";
pub const FLASH_COOKIE_NAME: &str = "appid_flash";

const STATE_COOKIE_MINUTES: i64 = 10;
const FLASH_COOKIE_MINUTES: i64 = 5;

/// Derive the 64-byte cookie key from arbitrary secret material.
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(&digest[..])
}

/// Session cookie. Its max-age counts from login and is not reissued on
/// later requests; the server-side entry additionally expires after
/// `ttl` of inactivity, whichever comes first.
pub fn session_cookie(session_id: &SessionId, ttl: std::time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)))
        .build()
}

/// Short-lived `state` cookie scoped to the login round trip.
pub fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(STATE_COOKIE_MINUTES))
        .build()
}

pub fn flash_cookie(message: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE_NAME, message.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(FLASH_COOKIE_MINUTES))
        .build()
}

/// Removal cookie for `name`.
pub fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

pub fn session_id(jar: &PrivateCookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|c| c.value().parse().ok())
}

pub fn pending_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Read and clear the flash message.
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE_NAME) {
        Some(cookie) => {
            let message = cookie.value().to_string();
            (jar.remove(removal(FLASH_COOKIE_NAME)), Some(message))
        }
        None => (jar, None),
    }
}
