// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! App ID public key (JWKS) fetching and caching.
//!
//! ## Behaviour
//!
//! - Keys are fetched lazily on first use and kept for the process lifetime
//!   unless a TTL is configured
//! - A warm cache is never re-fetched by `key_set`
//! - A `kid` missing from a warm cache triggers one forced re-fetch (key
//!   rotation), at most once per `min_refetch_interval`
//! - Lookups fail closed with `KeyNotFound`; verification is never skipped
//!
//! Concurrent cold-start callers may both fetch; the last write wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use super::error::OidcError;

const OPERATION: &str = "public key fetch";

/// Default spacing between rotation-triggered re-fetches.
const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Key set cache entry.
struct CacheEntry {
    jwks: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Public key cache owned by the OIDC client.
#[derive(Clone)]
pub struct KeyCache {
    /// App ID `publickeys` endpoint
    keys_url: Url,
    /// `None` keeps keys for the process lifetime
    cache_ttl: Option<Duration>,
    min_refetch_interval: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    client: reqwest::Client,
}

impl KeyCache {
    pub fn new(keys_url: Url, client: reqwest::Client) -> Self {
        Self {
            keys_url,
            cache_ttl: None,
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            client,
        }
    }

    /// Expire cached keys after `ttl`.
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.cache_ttl
            .map(|ttl| entry.fetched_at.elapsed() < ttl)
            .unwrap_or(true)
    }

    /// Cached key set, fetching it when cold.
    pub async fn key_set(&self) -> Result<Arc<JwkSet>, OidcError> {
        self.cached_or_fetch().await.map(|(jwks, _)| jwks)
    }

    /// Returns the key set and whether it was fetched by this call.
    async fn cached_or_fetch(&self) -> Result<(Arc<JwkSet>, bool), OidcError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if self.is_fresh(entry) {
                    return Ok((entry.jwks.clone(), false));
                }
            }
        }

        Ok((self.refresh().await?, true))
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, OidcError> {
        let response = self
            .client
            .get(self.keys_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OidcError::transport(OPERATION, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(OidcError::KeyFetchFailed {
                status: status.as_u16(),
            });
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| OidcError::InvalidResponse {
                operation: OPERATION,
                message: e.to_string(),
            })
    }

    /// Force a fetch and replace the cached key set.
    pub async fn refresh(&self) -> Result<Arc<JwkSet>, OidcError> {
        let jwks = Arc::new(self.fetch_jwks().await?);
        info!(keys = jwks.keys.len(), url = %self.keys_url, "Fetched provider public keys");

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }

    /// Whether a non-expired key set is cached.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        cache.as_ref().map(|e| self.is_fresh(e)).unwrap_or(false)
    }

    async fn may_refetch(&self) -> bool {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .map(|e| e.fetched_at.elapsed() >= self.min_refetch_interval)
            .unwrap_or(true)
    }

    /// Decoding key for `kid`.
    pub async fn decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), OidcError> {
        let (jwks, fetched) = self.cached_or_fetch().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        if fetched || !self.may_refetch().await {
            return Err(OidcError::KeyNotFound);
        }

        debug!(kid, "Key id not in cached set, re-fetching public keys");
        let jwks = self.refresh().await?;
        find_key(&jwks, kid)
            .ok_or(OidcError::KeyNotFound)
            .and_then(jwk_to_decoding_key)
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), OidcError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| OidcError::invalid_token(format!("unusable RSA key: {e}")))?;

            // App ID publishes RS256 keys, often without `alg`
            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| OidcError::invalid_token(format!("unusable EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(OidcError::invalid_token("unsupported key type in key set")),
    }
}
