// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: a signing key matching a published JWKS,
//! token builders and a mock App ID tenant.

use std::time::Duration;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::MockServer;

use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum_extra::extract::PrivateCookieJar;

use crate::auth::{cookies, OidcClient, ProviderConfig};
use crate::state::AppState;
use crate::store::SessionId;

pub const TEST_KID: &str = "appId-test-key-1";
pub const TEST_TENANT: &str = "tenant-1";
pub const TEST_CLIENT_ID: &str = "client-1";
pub const TEST_SECRET: &str = "s3cret";

const PROVIDER_KEY_PEM: &str = include_str!("../testdata/provider_rsa.pem");

/// Base64url modulus of `testdata/provider_rsa.pem`.
const PROVIDER_KEY_N: &str = "nEFRKhN0c5Wl6fup9E4vHPI6C8W7cYFH9oTQttQ1ZBuLQYC-pf6tvTcsXDwA_nWnIaNanlXg3WebuotDwEr3VF4BswlcI83APr-zPfd14Wgopg01tFdI7ntxalGJcojZuXPSp-6JpiJ86xYTzszuRF-nkJgFviOLC4-duJNEIDsyqhk0YF59aKeEPpB9czMhSSYHtnKsueAuuWHQ-9AayuJoHr-yD7nQqzaWXDrB0P6wEusuym78bj6_8W-p-kM-_lN3mH01EC0ZAlLs0LS0zJt7dUtZpB3Domwxdol3mK72bVS0dHGri6q8B9wQAst5F7QYaE5L9-ljHv86YBsATQ";

/// Key set published by the mock tenant.
pub fn jwks_body() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": TEST_KID,
            "n": PROVIDER_KEY_N,
            "e": "AQAB"
        }]
    })
}

/// Sign `claims` with the fixture key under `kid`.
pub fn sign_token(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(PROVIDER_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Standard App ID access-token payload expiring `expires_in_secs` from now.
pub fn token_claims(issuer: &str, expires_in_secs: i64) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "iss": issuer,
        "aud": [TEST_CLIENT_ID],
        "sub": "u1",
        "exp": now + expires_in_secs,
        "iat": now,
        "scope": "openid profile email",
        "tenant": TEST_TENANT
    })
}

/// Provider configuration pointing at `server`.
pub fn provider_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new("us-east", TEST_TENANT, TEST_CLIENT_ID, TEST_SECRET)
        .unwrap()
        .with_base_url(&server.uri())
        .unwrap()
}

/// Path of a tenant endpoint on the mock server.
pub fn tenant_path(endpoint: &str) -> String {
    format!("/oauth/v4/{TEST_TENANT}/{endpoint}")
}

pub fn oidc_client(server: &MockServer) -> OidcClient {
    OidcClient::new(provider_config(server), Duration::from_secs(2)).unwrap()
}

/// `Cookie` header value carrying `id` encrypted with the state's key.
pub fn session_cookie_header(state: &AppState, id: &SessionId) -> String {
    let jar = PrivateCookieJar::new(state.cookie_key.clone()).add(cookies::session_cookie(
        id,
        state.session_ttl,
        false,
    ));
    let response = (jar, ()).into_response();
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

/// Join the `name=value` pairs of every `Set-Cookie` header that is not a
/// removal, for replaying on the next request.
pub fn replay_cookies(response: &axum::response::Response) -> String {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.contains("Max-Age=0"))
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}
