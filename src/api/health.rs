// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::state::AppState;

const AUTH_PROVIDER: &str = "IBM App ID";

/// Health check endpoint handler.
///
/// Always 200 while the process is running. Reports whether the provider
/// is configured and whether its public keys are cached; never fetches.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (provider_status, public_keys) = match &state.oidc {
        Some(oidc) => {
            let cached = oidc.keys().is_cached().await;
            ("configured", if cached { "cached" } else { "cold" })
        }
        None => ("not_configured", "unavailable"),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        auth_provider: AUTH_PROVIDER.to_string(),
        provider_status: provider_status.to_string(),
        public_keys: public_keys.to_string(),
    })
}
