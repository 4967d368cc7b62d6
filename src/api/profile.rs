// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::auth::Authenticated;
use crate::models::ProfileResponse;

/// Identity claims of the signed-in user.
#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Stored identity claims", body = ProfileResponse),
        (status = 302, description = "No session; redirect to /login")
    )
)]
pub async fn profile(Authenticated { session, .. }: Authenticated) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: session.user_claims,
        logged_in_at: session.created_at.to_rfc3339(),
    })
}
