// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors that guard routes on a live session.
//!
//! Use `Authenticated` in protected handlers:
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated { session, .. }: Authenticated) -> impl IntoResponse {
//!     // session.user_claims holds the identity established at login
//! }
//! ```
//!
//! Extraction runs before the handler body, so no protected logic executes
//! for anonymous browsers.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts, response::Response};
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use crate::api::found;
use crate::state::AppState;
use crate::store::{Session, SessionId};

/// Where anonymous browsers are sent.
pub const LOGIN_PATH: &str = "/login";

/// Guard for protected routes.
///
/// Rejects with `302 /login` when the request carries no session cookie or
/// the session is no longer stored.
pub struct Authenticated {
    pub id: SessionId,
    pub session: Session,
}

async fn session_from_parts(parts: &mut Parts, state: &AppState) -> Option<(SessionId, Session)> {
    let jar: PrivateCookieJar = match PrivateCookieJar::from_request_parts(parts, state).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    };
    let id = cookies::session_id(&jar)?;
    let session = state.sessions.read(&id)?;
    Some((id, session))
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_from_parts(parts, state).await {
            Some((id, session)) => Ok(Authenticated { id, session }),
            None => {
                tracing::debug!(path = %parts.uri.path(), "No live session, redirecting to login");
                Err(found(LOGIN_PATH))
            }
        }
    }
}

/// Session if present; never rejects.
pub struct OptionalSession(pub Option<Authenticated>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(
            session_from_parts(parts, state)
                .await
                .map(|(id, session)| Authenticated { id, session }),
        ))
    }
}
