// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Landing and API data routes.

use axum::{extract::State, Json};
use axum_extra::extract::PrivateCookieJar;

use crate::auth::{cookies, Authenticated, OptionalSession};
use crate::models::{LandingResponse, ProtectedResponse, PublicStatus};
use crate::providers::backend::DATA_PATH;
use crate::state::AppState;

/// Public landing resource.
#[utoipa::path(
    get,
    path = "/",
    tag = "Public",
    responses((status = 200, description = "Landing", body = LandingResponse))
)]
pub async fn landing(
    jar: PrivateCookieJar,
    OptionalSession(current): OptionalSession,
) -> (PrivateCookieJar, Json<LandingResponse>) {
    let (jar, flash) = cookies::take_flash(jar);
    let authenticated = current.is_some();
    let message = if authenticated {
        "Signed in"
    } else {
        "Sign in at /login"
    };

    (
        jar,
        Json(LandingResponse {
            message: message.to_string(),
            authenticated,
            flash,
        }),
    )
}

/// Unguarded endpoint reporting whether the browser is signed in.
#[utoipa::path(
    get,
    path = "/api/public",
    tag = "Public",
    responses((status = 200, description = "Authentication status", body = PublicStatus))
)]
pub async fn public(
    jar: PrivateCookieJar,
    OptionalSession(current): OptionalSession,
) -> (PrivateCookieJar, Json<PublicStatus>) {
    let (jar, flash) = cookies::take_flash(jar);
    let user = current.map(|auth| auth.session.user_claims);

    (
        jar,
        Json(PublicStatus {
            authenticated: user.is_some(),
            message: "This is a public API endpoint".to_string(),
            user,
            flash,
        }),
    )
}

/// Guarded endpoint that calls the backend with the session's token.
///
/// A backend failure does not fail the request: `backend_data` carries
/// `{"error": reason}` next to the still valid identity.
#[utoipa::path(
    get,
    path = "/api/protected",
    tag = "Protected",
    responses(
        (status = 200, description = "Identity and backend data", body = ProtectedResponse),
        (status = 302, description = "No session; redirect to /login")
    )
)]
pub async fn protected(
    State(state): State<AppState>,
    Authenticated { session, .. }: Authenticated,
) -> Json<ProtectedResponse> {
    let backend_data = state
        .backend
        .call_backend(DATA_PATH, &session.access_token)
        .await;

    Json(ProtectedResponse {
        message: "This is a protected API endpoint".to_string(),
        user: session.user_claims,
        backend_data,
    })
}
