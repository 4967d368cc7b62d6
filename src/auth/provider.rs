// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IBM App ID provider configuration and endpoint derivation.
//!
//! All endpoints live under the tenant-scoped OAuth server path:
//!
//! ```text
//! https://{region}.appid.cloud.ibm.com/oauth/v4/{tenant_id}/authorization
//!                                                         /token
//!                                                         /userinfo
//!                                                         /publickeys
//! ```
//!
//! The OAuth server URL itself is the expected `iss` claim of issued tokens.

use url::Url;

use crate::config::ConfigError;

/// Immutable provider settings plus the endpoints derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    region: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
    endpoints: Endpoints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoints {
    oauth_server: String,
    authorization: Url,
    token: Url,
    userinfo: Url,
    public_keys: Url,
}

impl Endpoints {
    fn derive(base_url: &str, tenant_id: &str) -> Result<Self, ConfigError> {
        let base = base_url.trim_end_matches('/');
        let oauth_server = format!("{base}/oauth/v4/{tenant_id}");

        let endpoint = |suffix: &str| {
            Url::parse(&format!("{oauth_server}/{suffix}"))
                .map_err(|e| ConfigError::invalid("APPID_BASE_URL", e.to_string()))
        };

        Ok(Self {
            authorization: endpoint("authorization")?,
            token: endpoint("token")?,
            userinfo: endpoint("userinfo")?,
            public_keys: endpoint("publickeys")?,
            oauth_server,
        })
    }
}

impl ProviderConfig {
    /// Build the configuration for a hosted App ID tenant.
    pub fn new(
        region: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let region = region.into();
        let tenant_id = tenant_id.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if region.is_empty()
            || !region
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::invalid(
                "APPID_REGION",
                format!("`{region}` is not a valid region"),
            ));
        }
        if tenant_id.is_empty() || tenant_id.contains(['/', '?', '#']) {
            return Err(ConfigError::invalid(
                "APPID_TENANT_ID",
                "tenant id must be a single path segment",
            ));
        }
        if client_id.is_empty() {
            return Err(ConfigError::Missing("APPID_CLIENT_ID".to_string()));
        }
        if client_secret.is_empty() {
            return Err(ConfigError::Missing("APPID_SECRET".to_string()));
        }

        let endpoints =
            Endpoints::derive(&format!("https://{region}.appid.cloud.ibm.com"), &tenant_id)?;

        Ok(Self {
            region,
            tenant_id,
            client_id,
            client_secret,
            redirect_uri: None,
            endpoints,
        })
    }

    /// Point every endpoint at a different host (private deployments, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ConfigError::invalid("APPID_BASE_URL", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "APPID_BASE_URL",
                "base URL must use http or https",
            ));
        }
        self.endpoints = Endpoints::derive(base_url, &self.tenant_id)?;
        Ok(self)
    }

    /// Use a fixed callback URL instead of deriving it per request.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Result<Self, ConfigError> {
        let redirect_uri = redirect_uri.into();
        Url::parse(&redirect_uri)
            .map_err(|e| ConfigError::invalid("APPID_REDIRECT_URI", e.to_string()))?;
        self.redirect_uri = Some(redirect_uri);
        Ok(self)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Configured callback URL, if one overrides request derivation.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Expected `iss` claim: the tenant's OAuth server URL.
    pub fn issuer(&self) -> &str {
        &self.endpoints.oauth_server
    }

    pub fn authorization_endpoint(&self) -> &Url {
        &self.endpoints.authorization
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.endpoints.token
    }

    pub fn userinfo_endpoint(&self) -> &Url {
        &self.endpoints.userinfo
    }

    pub fn public_keys_endpoint(&self) -> &Url {
        &self.endpoints.public_keys
    }
}
