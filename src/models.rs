// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response bodies of the JSON routes. All types derive `Serialize` and
//! `ToSchema` for JSON handling and OpenAPI documentation. Identity claims
//! and backend payloads are free-form objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::UserClaims;

// =============================================================================
// Public Models
// =============================================================================

/// Landing resource.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LandingResponse {
    pub message: String,
    /// Whether the browser holds a live session.
    pub authenticated: bool,
    /// Reason of the last failed login, shown once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
}

/// Unguarded API status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicStatus {
    pub authenticated: bool,
    pub message: String,
    /// Identity claims when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub user: Option<UserClaims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
}

// =============================================================================
// Authenticated Models
// =============================================================================

/// Claims established at login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = Object)]
    pub user: UserClaims,
    /// When the session was established (RFC 3339).
    pub logged_in_at: String,
}

/// Guarded API resource combining identity and backend data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProtectedResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub user: UserClaims,
    /// Backend payload, or `{"error": reason}` when the backend failed.
    #[schema(value_type = Object)]
    pub backend_data: Value,
}

/// Result of a token refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub refreshed: bool,
    /// Lifetime of the new access token in seconds, if reported.
    pub expires_in: Option<u64>,
}

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: String,
    /// Identity provider name.
    pub auth_provider: String,
    /// `configured` or `not_configured`.
    pub provider_status: String,
    /// Public key cache: `cached`, `cold` or `unavailable`.
    pub public_keys: String,
}
