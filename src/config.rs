// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, default values and the [`AppConfig`] loader.
//! Configuration is read once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APPID_REGION` | App ID region segment of the provider host | `us-east` |
//! | `APPID_TENANT_ID` | App ID tenant id | Required |
//! | `APPID_CLIENT_ID` | OAuth client id | Required |
//! | `APPID_SECRET` | OAuth client secret | Required |
//! | `APPID_REDIRECT_URI` | Callback URL override | Derived per request |
//! | `APPID_BASE_URL` | Provider base URL override | `https://{region}.appid.cloud.ibm.com` |
//! | `BACKEND_URL` | Backend API base URL | `http://localhost:8080` |
//! | `SECRET_KEY` | Cookie encryption key material | Development key |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `HTTP_TIMEOUT_SECS` | Provider request timeout | `15` |
//! | `BACKEND_TIMEOUT_SECS` | Backend request timeout | `10` |
//! | `JWKS_CACHE_TTL_SECS` | Public key cache TTL | Process lifetime |
//! | `SESSION_CAPACITY` | Maximum live sessions | `10000` |
//! | `SESSION_TTL_SECS` | Idle session lifetime | `86400` |
//! | `SECURE_COOKIES` | Mark cookies `Secure` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::time::Duration;

use crate::auth::ProviderConfig;

pub const APPID_REGION_ENV: &str = "APPID_REGION";
pub const APPID_TENANT_ID_ENV: &str = "APPID_TENANT_ID";
pub const APPID_CLIENT_ID_ENV: &str = "APPID_CLIENT_ID";
pub const APPID_SECRET_ENV: &str = "APPID_SECRET";
pub const APPID_REDIRECT_URI_ENV: &str = "APPID_REDIRECT_URI";
pub const APPID_BASE_URL_ENV: &str = "APPID_BASE_URL";
pub const BACKEND_URL_ENV: &str = "BACKEND_URL";
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const HTTP_TIMEOUT_ENV: &str = "HTTP_TIMEOUT_SECS";
pub const BACKEND_TIMEOUT_ENV: &str = "BACKEND_TIMEOUT_SECS";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const SESSION_CAPACITY_ENV: &str = "SESSION_CAPACITY";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const SECURE_COOKIES_ENV: &str = "SECURE_COOKIES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_REGION: &str = "us-east";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Used when `SECRET_KEY` is unset. Startup logs a warning.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_CAPACITY: usize = 10_000;
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

impl ConfigError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// App ID settings. Kept as a `Result` so the server can start and
    /// report a misconfigured provider on first use.
    pub provider: Result<ProviderConfig, ConfigError>,
    pub backend_url: String,
    pub secret_key: String,
    pub secret_key_is_default: bool,
    pub host: String,
    pub port: u16,
    pub http_timeout: Duration,
    pub backend_timeout: Duration,
    pub jwks_cache_ttl: Option<Duration>,
    pub session_capacity: usize,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let provider = load_provider(&env);

        let secret_key = env.optional(SECRET_KEY_ENV);
        let secret_key_is_default = secret_key.is_none();

        Ok(Self {
            provider,
            backend_url: env.or_default(BACKEND_URL_ENV, DEFAULT_BACKEND_URL),
            secret_key: secret_key.unwrap_or_else(|| DEV_SECRET_KEY.to_string()),
            secret_key_is_default,
            host: env.or_default(HOST_ENV, DEFAULT_HOST),
            port: env.parsed(PORT_ENV)?.unwrap_or(DEFAULT_PORT),
            http_timeout: Duration::from_secs(
                env.parsed(HTTP_TIMEOUT_ENV)?
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            backend_timeout: Duration::from_secs(
                env.parsed(BACKEND_TIMEOUT_ENV)?
                    .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS),
            ),
            jwks_cache_ttl: env
                .parsed::<u64>(JWKS_CACHE_TTL_ENV)?
                .map(Duration::from_secs),
            session_capacity: env
                .parsed(SESSION_CAPACITY_ENV)?
                .unwrap_or(DEFAULT_SESSION_CAPACITY),
            session_ttl: Duration::from_secs(
                env.parsed(SESSION_TTL_ENV)?
                    .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
            secure_cookies: env.flag(SECURE_COOKIES_ENV)?,
            log_format: match env.optional(LOG_FORMAT_ENV).as_deref() {
                Some("json") => LogFormat::Json,
                Some("pretty") | None => LogFormat::Pretty,
                Some(other) => {
                    return Err(ConfigError::invalid(
                        LOG_FORMAT_ENV,
                        format!("expected `json` or `pretty`, got `{other}`"),
                    ))
                }
            },
        })
    }
}

fn load_provider<F>(env: &Lookup<F>) -> Result<ProviderConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let region = env.or_default(APPID_REGION_ENV, DEFAULT_REGION);
    let tenant_id = env.required(APPID_TENANT_ID_ENV)?;
    let client_id = env.required(APPID_CLIENT_ID_ENV)?;
    let client_secret = env.required(APPID_SECRET_ENV)?;

    let mut provider = ProviderConfig::new(region, tenant_id, client_id, client_secret)?;
    if let Some(base_url) = env.optional(APPID_BASE_URL_ENV) {
        provider = provider.with_base_url(&base_url)?;
    }
    if let Some(redirect_uri) = env.optional(APPID_REDIRECT_URI_ENV) {
        provider = provider.with_redirect_uri(redirect_uri)?;
    }
    Ok(provider)
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| ConfigError::invalid(name, e.to_string()))
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<bool, ConfigError> {
        match self.optional(name).map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("0") | Some("false") | Some("no") => Ok(false),
            Some("1") | Some("true") | Some("yes") => Ok(true),
            Some(other) => Err(ConfigError::invalid(
                name,
                format!("expected a boolean, got `{other}`"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const PROVIDER_VARS: [(&str, &str); 3] = [
        (APPID_TENANT_ID_ENV, "tenant-1"),
        (APPID_CLIENT_ID_ENV, "client-1"),
        (APPID_SECRET_ENV, "s3cret"),
    ];

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&PROVIDER_VARS).unwrap();

        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.port, 5000);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.backend_timeout, Duration::from_secs(10));
        assert!(config.jwks_cache_ttl.is_none());
        assert!(config.secret_key_is_default);
        assert!(!config.secure_cookies);
        assert_eq!(config.log_format, LogFormat::Pretty);

        let provider = config.provider.unwrap();
        assert_eq!(provider.region(), "us-east");
        assert_eq!(
            provider.issuer(),
            "https://us-east.appid.cloud.ibm.com/oauth/v4/tenant-1"
        );
    }

    #[test]
    fn missing_provider_keys_do_not_fail_startup() {
        let config = load(&[(PORT_ENV, "7000")]).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(
            config.provider.unwrap_err(),
            ConfigError::Missing(APPID_TENANT_ID_ENV.to_string())
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut vars = PROVIDER_VARS.to_vec();
        vars.push((APPID_REGION_ENV, "  "));
        let config = load(&vars).unwrap();
        assert_eq!(config.provider.unwrap().region(), DEFAULT_REGION);
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = PROVIDER_VARS.to_vec();
        vars.extend([
            (APPID_REGION_ENV, "eu-gb"),
            (APPID_REDIRECT_URI_ENV, "https://app.example.com/auth/callback"),
            (JWKS_CACHE_TTL_ENV, "600"),
            (SECURE_COOKIES_ENV, "true"),
            (LOG_FORMAT_ENV, "json"),
            (SECRET_KEY_ENV, "k"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.jwks_cache_ttl, Some(Duration::from_secs(600)));
        assert!(config.secure_cookies);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.secret_key_is_default);

        let provider = config.provider.unwrap();
        assert_eq!(
            provider.redirect_uri(),
            Some("https://app.example.com/auth/callback")
        );
        assert!(provider
            .token_endpoint()
            .as_str()
            .starts_with("https://eu-gb.appid.cloud.ibm.com/"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = load(&[(PORT_ENV, "not-a-port")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == PORT_ENV));
    }

    #[test]
    fn invalid_log_format_is_rejected() {
        let err = load(&[(LOG_FORMAT_ENV, "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
