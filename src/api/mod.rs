// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::LOCATION, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    gateway::CALLBACK_PATH,
    models::{
        HealthResponse, LandingResponse, ProfileResponse, ProtectedResponse, PublicStatus,
        RefreshResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod data;
pub mod health;
pub mod profile;

/// Protected resource the browser lands on after login.
pub const PROFILE_PATH: &str = "/profile";

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(data::landing))
        .route("/login", get(auth::login))
        .route(CALLBACK_PATH, get(auth::callback))
        .route("/auth/refresh", post(auth::refresh))
        .route("/logout", get(auth::logout))
        .route(PROFILE_PATH, get(profile::profile))
        .route("/api/public", get(data::public))
        .route("/api/protected", get(data::protected))
        .route("/health", get(health::health))
        .fallback(not_found)
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        data::landing,
        data::public,
        data::protected,
        auth::login,
        auth::callback,
        auth::logout,
        auth::refresh,
        profile::profile,
        health::health
    ),
    components(
        schemas(
            LandingResponse,
            PublicStatus,
            ProfileResponse,
            ProtectedResponse,
            RefreshResponse,
            HealthResponse
        )
    ),
    tags(
        (name = "Public", description = "Unguarded resources"),
        (name = "Auth", description = "App ID login flow and session lifecycle"),
        (name = "Profile", description = "Signed-in identity"),
        (name = "Protected", description = "Guarded resources backed by the backend API"),
        (name = "Health", description = "Service status")
    )
)]
struct ApiDoc;
