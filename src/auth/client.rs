// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IBM App ID OAuth2 / OIDC client.
//!
//! Constructed once at startup and shared through `AppState`. It owns the
//! HTTP client (with a bounded timeout) and the public key cache; it knows
//! nothing about sessions or routing.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Validation};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{error, info};
use url::Url;

use super::claims::{AccessTokenClaims, TokenSet, UserClaims};
use super::error::OidcError;
use super::jwks::KeyCache;
use super::provider::ProviderConfig;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Scopes requested at login.
pub const LOGIN_SCOPE: &str = "openid profile email";

/// OAuth2 client for one App ID tenant.
pub struct OidcClient {
    config: ProviderConfig,
    http: reqwest::Client,
    keys: KeyCache,
}

impl OidcClient {
    /// Create a client whose provider calls give up after `timeout`.
    pub fn new(config: ProviderConfig, timeout: Duration) -> Result<Self, OidcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OidcError::Transport {
                operation: "client setup",
                message: e.to_string(),
            })?;

        let keys = KeyCache::new(config.public_keys_endpoint().clone(), http.clone());

        info!(
            tenant_id = config.tenant_id(),
            region = config.region(),
            "Initialized App ID client"
        );

        Ok(Self { config, http, keys })
    }

    /// Expire cached public keys after `ttl` (default: never).
    pub fn with_key_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.keys = self.keys.with_cache_ttl(ttl);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyCache {
        &self.keys
    }

    /// Authorization redirect for the code flow. No network call.
    pub fn build_login_url(&self, redirect_uri: &str, state: Option<&str>) -> Url {
        let mut url = self.config.authorization_endpoint().clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", self.config.client_id())
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("scope", LOGIN_SCOPE);
            if let Some(state) = state {
                query.append_pair("state", state);
            }
        }
        url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Success only means tokens were issued; they still need verification.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, OidcError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id()),
            ("client_secret", self.config.client_secret()),
        ];

        let tokens: TokenSet = self
            .post_token_form("token exchange", &params, |status, body| {
                OidcError::ExchangeFailed { status, body }
            })
            .await?;

        info!("Exchanged authorization code for tokens");
        Ok(tokens)
    }

    /// Provider key set, fetched once and cached.
    pub async fn fetch_public_keys(&self) -> Result<Arc<JwkSet>, OidcError> {
        self.keys.key_set().await
    }

    /// Verify a signed App ID token and return its claims.
    ///
    /// Checks signature, `exp`, `aud == client_id` and `iss == issuer`.
    pub async fn verify_token(&self, token: &str) -> Result<AccessTokenClaims, OidcError> {
        let header = decode_header(token)
            .map_err(|e| OidcError::invalid_token(format!("malformed token header: {e}")))?;

        let kid = header.kid.ok_or(OidcError::KeyNotFound)?;
        let (decoding_key, algorithm) = self.keys.decoding_key(&kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_audience(&[self.config.client_id()]);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data = decode::<AccessTokenClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => OidcError::Expired,
                _ => OidcError::invalid_token(e.to_string()),
            })?;

        info!(sub = %token_data.claims.sub, "Token verified");
        Ok(token_data.claims)
    }

    /// Identity claims for the holder of `access_token`.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<UserClaims, OidcError> {
        const OPERATION: &str = "user info";

        let response = self
            .http
            .get(self.config.userinfo_endpoint().clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OidcError::transport(OPERATION, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "User info request failed");
            return Err(OidcError::UserInfoFailed {
                status: status.as_u16(),
            });
        }

        let claims: UserClaims = read_json(OPERATION, response).await?;
        info!(sub = claims.sub().unwrap_or("<none>"), "Retrieved user info");
        Ok(claims)
    }

    /// Trade a refresh token for a new token set.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, OidcError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id()),
            ("client_secret", self.config.client_secret()),
        ];

        let tokens: TokenSet = self
            .post_token_form("token refresh", &params, |status, _| {
                OidcError::RefreshFailed { status }
            })
            .await?;

        info!("Refreshed tokens");
        Ok(tokens)
    }

    async fn post_token_form<T, F>(
        &self,
        operation: &'static str,
        params: &[(&str, &str)],
        on_status: F,
    ) -> Result<T, OidcError>
    where
        T: DeserializeOwned,
        F: FnOnce(u16, String) -> OidcError,
    {
        let response = self
            .http
            .post(self.config.token_endpoint().clone())
            .header(ACCEPT, "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| OidcError::transport(operation, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(operation, status = status.as_u16(), body = %body, "Token endpoint rejected request");
            return Err(on_status(status.as_u16(), body));
        }

        read_json(operation, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T, OidcError> {
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            OidcError::Timeout { operation }
        } else {
            OidcError::InvalidResponse {
                operation,
                message: e.to_string(),
            }
        }
    })
}
