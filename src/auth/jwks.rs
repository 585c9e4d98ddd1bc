// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key resolution (JWKS fetching and caching).
//!
//! ## Key policy
//!
//! - Keys are cached by `kid` with a configurable TTL
//! - A `kid` that is not cached triggers one refetch, rate limited so forged
//!   key ids cannot hammer the issuer; readiness probes on a cold cache
//!   share the same spacing
//! - Fetches have a bounded timeout; failures surface as
//!   [`AuthError::KeyFetch`] and are never served from a stale cache
//! - Only RSA signing keys are loaded, everything else in the set is skipped
//!
//! The authorizer only sees the [`SigningKeyResolver`] trait, so tests and
//! offline deployments can plug in a [`StaticKeyResolver`] instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};

use super::error::AuthError;

/// Default JWKS cache TTL (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default timeout for a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between refetches caused by unknown key ids.
const MISS_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Resolves a token's key id to a verification key.
#[async_trait]
pub trait SigningKeyResolver: Send + Sync {
    /// Look up the key for `kid`, failing with [`AuthError::NoMatchingKey`]
    /// when the issuer does not publish it.
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError>;

    /// Whether keys can currently be served (used by health checks).
    async fn is_ready(&self) -> bool {
        true
    }
}

/// JWKS cache entry.
struct CacheEntry {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Remote JWKS resolver with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL (issuer's well-known endpoint)
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Minimum age of the cache before an unknown kid forces a refetch
    miss_refresh_interval: Duration,
    /// Cached keys
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Time and outcome of the last readiness fetch
    last_probe: Arc<Mutex<Option<(Instant, bool)>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g., `https://tenant.auth0.com/.well-known/jwks.json`)
    /// - `fetch_timeout`: Upper bound on a single fetch
    pub fn new(jwks_url: impl Into<String>, fetch_timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| AuthError::KeyFetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            miss_refresh_interval: MISS_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            last_probe: Arc::new(Mutex::new(None)),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override how soon an unknown kid may trigger another fetch.
    pub fn with_miss_refresh_interval(mut self, interval: Duration) -> Self {
        self.miss_refresh_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS from the endpoint and convert the usable keys.
    async fn fetch_keys(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| fetch_failed(&self.jwks_url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_failed(
                &self.jwks_url,
                format!("HTTP {} from JWKS endpoint", response.status()),
            ));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| fetch_failed(&self.jwks_url, e.to_string()))?;

        let keys = keys_from_jwks(&jwks);
        tracing::debug!(count = keys.len(), "Loaded signing keys");
        Ok(keys)
    }

    /// Force refresh the key cache.
    ///
    /// On failure the previous cache entry is left untouched.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let keys = self.fetch_keys().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    /// Check if keys are currently cached and fresh.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        matches!(&*cache, Some(entry) if entry.fetched_at.elapsed() < self.cache_ttl)
    }

    /// Look up `kid` in the cache without touching the network.
    ///
    /// `Some(Err(NoMatchingKey))` means the cache is fresh enough that a miss
    /// should not trigger a refetch yet.
    async fn cached_lookup(&self, kid: &str) -> Option<Result<DecodingKey, AuthError>> {
        let cache = self.cache.read().await;
        let entry = cache.as_ref()?;
        let age = entry.fetched_at.elapsed();
        if age >= self.cache_ttl {
            return None;
        }

        match entry.keys.get(kid) {
            Some(key) => Some(Ok(key.clone())),
            None if age < self.miss_refresh_interval => Some(Err(AuthError::NoMatchingKey)),
            None => None,
        }
    }
}

#[async_trait]
impl SigningKeyResolver for JwksManager {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(result) = self.cached_lookup(kid).await {
            return result;
        }

        self.refresh().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|entry| entry.keys.get(kid).cloned())
            .ok_or(AuthError::NoMatchingKey)
    }

    /// A cold or expired cache is probed with a fetch at most once per
    /// miss refresh interval; in between the last outcome is reported.
    async fn is_ready(&self) -> bool {
        if self.is_cached().await {
            return true;
        }

        let mut last_probe = self.last_probe.lock().await;
        if let Some((at, ready)) = *last_probe {
            if at.elapsed() < self.miss_refresh_interval {
                return ready;
            }
        }
        let ready = self.refresh().await.is_ok();
        *last_probe = Some((Instant::now(), ready));
        ready
    }
}

fn fetch_failed(url: &str, detail: String) -> AuthError {
    tracing::warn!(url = %url, error = %detail, "JWKS fetch failed");
    AuthError::KeyFetch(detail)
}

/// Fixed, in-memory key set.
///
/// Used by tests and by deployments that pin the issuer's keys.
#[derive(Clone, Default)]
pub struct StaticKeyResolver {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the key for `kid`.
    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    /// Load every usable key from a parsed JWKS document.
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        Self {
            keys: keys_from_jwks(jwks),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl SigningKeyResolver for StaticKeyResolver {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        self.keys.get(kid).cloned().ok_or(AuthError::NoMatchingKey)
    }
}

/// Convert every RSA signing key that carries a `kid`.
fn keys_from_jwks(jwks: &JwkSet) -> HashMap<String, DecodingKey> {
    jwks.keys
        .iter()
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone()?;
            match jwk_to_decoding_key(jwk) {
                Some(key) => Some((kid, key)),
                None => {
                    tracing::debug!(kid = %kid, "Skipping unusable JWK");
                    None
                }
            }
        })
        .collect()
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return None;
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
        _ => None,
    }
}
