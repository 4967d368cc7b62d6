// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, callback, logout and refresh routes.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::PrivateCookieJar;
use tracing::{error, warn};

use super::{found, PROFILE_PATH};
use crate::auth::cookies::{self, SESSION_COOKIE_NAME, STATE_COOKIE_NAME};
use crate::auth::extractor::LOGIN_PATH;
use crate::auth::{Authenticated, OidcClient, OidcError, OptionalSession};
use crate::config::{ConfigError, APPID_TENANT_ID_ENV};
use crate::error::ApiError;
use crate::gateway::{self, callback_url, CallbackParams, Gateway, LoginStart, StateCheck};
use crate::models::RefreshResponse;
use crate::state::AppState;

fn provider(state: &AppState) -> Result<&OidcClient, ApiError> {
    state.oidc.as_deref().ok_or_else(|| {
        let err = OidcError::Config(state.provider_error.clone().unwrap_or_else(|| {
            ConfigError::Missing(APPID_TENANT_ID_ENV.to_string())
        }));
        error!(error = %err, "Login attempted without a configured provider");
        ApiError::from(err)
    })
}

/// Start the login flow.
#[utoipa::path(
    get,
    path = "/login",
    tag = "Auth",
    responses(
        (status = 302, description = "Redirect to App ID, or to /profile when already signed in"),
        (status = 500, description = "Identity provider not configured")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    OptionalSession(current): OptionalSession,
) -> Result<Response, ApiError> {
    let oidc = provider(&state)?;
    let redirect_uri = callback_url(
        oidc.config().redirect_uri(),
        &headers,
        &state.fallback_host,
    );

    let current = current.as_ref().map(|auth| &auth.session);
    Ok(match Gateway::new(oidc, &state.sessions).login(current, &redirect_uri) {
        LoginStart::AlreadyAuthenticated => found(PROFILE_PATH),
        LoginStart::Redirect { url, state: csrf } => {
            let jar = jar.add(cookies::state_cookie(&csrf, state.secure_cookies));
            (jar, found(url.as_str())).into_response()
        }
    })
}

/// Provider redirect target.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "Auth",
    params(CallbackParams),
    responses(
        (status = 302, description = "Redirect to /profile on success, /login on failure"),
        (status = 500, description = "Identity provider not configured")
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let oidc = provider(&state)?;
    let redirect_uri = callback_url(
        oidc.config().redirect_uri(),
        &headers,
        &state.fallback_host,
    );

    let previous = cookies::session_id(&jar);
    let expected_state = cookies::pending_state(&jar);
    let jar = jar
        .remove(cookies::removal(STATE_COOKIE_NAME))
        .remove(cookies::removal(SESSION_COOKIE_NAME));

    let outcome = Gateway::new(oidc, &state.sessions)
        .callback(
            &params,
            StateCheck::Required(expected_state.as_deref()),
            previous.as_ref(),
            &redirect_uri,
        )
        .await;

    Ok(match outcome {
        Ok((id, _)) => {
            let jar = jar.add(cookies::session_cookie(
                &id,
                state.session_ttl,
                state.secure_cookies,
            ));
            (jar, found(PROFILE_PATH)).into_response()
        }
        Err(e) => {
            warn!(reason = %e.reason(), error = %e, "Login failed");
            let jar = jar.add(cookies::flash_cookie(&e.reason(), state.secure_cookies));
            (jar, found(LOGIN_PATH)).into_response()
        }
    })
}

/// End the session.
#[utoipa::path(
    get,
    path = "/logout",
    tag = "Auth",
    responses((status = 302, description = "Redirect to /"))
)]
pub async fn logout(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    gateway::logout(&state.sessions, cookies::session_id(&jar).as_ref());
    let jar = jar.remove(cookies::removal(SESSION_COOKIE_NAME));
    (jar, found("/")).into_response()
}

/// Exchange the session's refresh token for fresh tokens.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Tokens refreshed", body = RefreshResponse),
        (status = 302, description = "No session; redirect to /login"),
        (status = 400, description = "Session has no refresh token"),
        (status = 502, description = "Provider rejected the refresh")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Authenticated { id, session }: Authenticated,
) -> Result<Json<RefreshResponse>, ApiError> {
    let oidc = provider(&state)?;
    let (_, tokens) = Gateway::new(oidc, &state.sessions)
        .refresh(&id, &session)
        .await
        .map_err(|e| {
            warn!(reason = %e.reason(), error = %e, "Token refresh failed");
            ApiError::from(e)
        })?;

    Ok(Json(RefreshResponse {
        refreshed: true,
        expires_in: tokens.expires_in,
    }))
}
