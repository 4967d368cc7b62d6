// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tracing::{error, info};

use crate::auth::{cookies, OidcClient};
use crate::config::{AppConfig, ConfigError};
use crate::providers::BackendProxy;
use crate::store::SessionStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// App ID client; `None` when the provider configuration is unusable.
    pub oidc: Option<Arc<OidcClient>>,
    /// Why `oidc` is `None`.
    pub provider_error: Option<ConfigError>,
    pub sessions: Arc<SessionStore>,
    pub backend: Arc<BackendProxy>,
    pub cookie_key: Key,
    pub secure_cookies: bool,
    pub session_ttl: Duration,
    /// Host used for the callback URL when the request carries none.
    pub fallback_host: String,
}

impl AppState {
    pub fn new(sessions: SessionStore, backend: BackendProxy, cookie_key: Key) -> Self {
        Self {
            oidc: None,
            provider_error: None,
            sessions: Arc::new(sessions),
            backend: Arc::new(backend),
            cookie_key,
            secure_cookies: false,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            fallback_host: format!("localhost:{}", crate::config::DEFAULT_PORT),
        }
    }

    pub fn with_oidc(mut self, oidc: OidcClient) -> Self {
        self.oidc = Some(Arc::new(oidc));
        self.provider_error = None;
        self
    }

    pub fn with_provider_error(mut self, err: ConfigError) -> Self {
        self.oidc = None;
        self.provider_error = Some(err);
        self
    }

    /// Build the state from loaded configuration.
    ///
    /// A provider misconfiguration is recorded, not returned: the server
    /// still starts and reports it on the login routes.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let backend = BackendProxy::new(&config.backend_url, config.backend_timeout)?;
        let sessions = SessionStore::new(config.session_capacity, config.session_ttl);

        let mut state = Self::new(sessions, backend, cookies::cookie_key(&config.secret_key));
        state.secure_cookies = config.secure_cookies;
        state.session_ttl = config.session_ttl;
        state.fallback_host = format!("localhost:{}", config.port);

        let oidc = config.provider.clone().and_then(|provider| {
            OidcClient::new(provider, config.http_timeout)
                .map_err(|e| ConfigError::invalid("provider HTTP client", e.to_string()))
        });

        Ok(match oidc {
            Ok(client) => {
                info!(
                    tenant_id = %client.config().tenant_id(),
                    issuer = %client.config().issuer(),
                    "App ID provider configured"
                );
                state.with_oidc(client.with_key_cache_ttl(config.jwks_cache_ttl))
            }
            Err(err) => {
                error!(error = %err, "App ID provider is not configured; login is disabled");
                state.with_provider_error(err)
            }
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// State without a provider and with a backend nothing listens on.
#[cfg(test)]
pub fn test_state() -> AppState {
    AppState::new(
        SessionStore::new(100, Duration::from_secs(300)),
        BackendProxy::new("http://127.0.0.1:9", Duration::from_millis(500))
            .expect("static backend url"),
        cookies::cookie_key("test-secret"),
    )
    .with_provider_error(ConfigError::Missing("APPID_TENANT_ID".to_string()))
}
