//! Signing-key cache for the identity provider's published JWKS.
//!
//! Keys are kept for the `max-age` the provider advertises (or a configured
//! fallback). Refreshes are single-flight: concurrent callers that miss the
//! cache wait on one fetch instead of each issuing their own.

use jsonwebtoken::DecodingKey;
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::provider::ProviderError;

/// Unknown `kid` lookups never refetch more often than this.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

struct CachedKeys {
    keys: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
    ttl: Duration,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

pub struct KeyCache {
    source: Option<KeySource>,
    cached: RwLock<Option<CachedKeys>>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
}

struct KeySource {
    url: String,
    http: reqwest::Client,
    default_ttl: Duration,
}

impl KeyCache {
    pub fn remote(url: impl Into<String>, http: reqwest::Client, default_ttl: Duration) -> Self {
        Self {
            source: Some(KeySource {
                url: url.into(),
                http,
                default_ttl,
            }),
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Fixed key set that never expires and never refreshes
    pub fn fixed(keys: HashMap<String, DecodingKey>) -> Self {
        let keys = keys.into_iter().map(|(kid, key)| (kid, Arc::new(key))).collect();
        Self {
            source: None,
            cached: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
                ttl: Duration::MAX,
            })),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
        }
    }

    pub async fn key(&self, kid: &str) -> Result<Arc<DecodingKey>, ProviderError> {
        let seen = self.generation.load(Ordering::Acquire);
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.is_fresh() {
                    if let Some(key) = entry.keys.get(kid) {
                        return Ok(key.clone());
                    }
                    // Fresh set without this kid: only refetch if it is not brand new
                    if entry.fetched_at.elapsed() < MIN_REFRESH_INTERVAL {
                        return Err(ProviderError::UnknownKey(kid.to_string()));
                    }
                }
            }
        }

        self.refresh(seen).await?;

        let cached = self.cached.read().await;
        cached
            .as_ref()
            .and_then(|entry| entry.keys.get(kid).cloned())
            .ok_or_else(|| ProviderError::UnknownKey(kid.to_string()))
    }

    /// Refetches unless another caller already refreshed since `seen`
    async fn refresh(&self, seen: u64) -> Result<(), ProviderError> {
        let Some(source) = self.source.as_ref() else {
            return Ok(());
        };

        let _guard = self.refresh_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            return Ok(());
        }

        info!(url = %source.url, "Fetching identity provider signing keys");

        let response = source
            .http
            .get(&source.url)
            .send()
            .await
            .map_err(|e| ProviderError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::KeyFetch(format!(
                "JWKS fetch failed with status: {}",
                response.status()
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(source.default_ttl);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| ProviderError::KeyFetch(format!("Failed to parse JWKS: {e}")))?;

        let keys: HashMap<_, _> = jwks
            .keys
            .iter()
            .filter_map(|jwk| jwk_to_decoding_key(jwk).map(|key| (jwk.kid.clone(), Arc::new(key))))
            .collect();

        info!(keys = keys.len(), ttl_secs = ttl.as_secs(), "Signing key cache updated");

        *self.cached.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
            ttl,
        });
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.cached.read().await.as_ref().map_or(0, |entry| entry.keys.len())
    }
}

fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        warn!(kid = %jwk.kid, kty = %jwk.kty, "Skipping non-RSA signing key");
        return None;
    }
    if matches!(jwk.alg.as_deref(), Some(alg) if alg != "RS256") {
        warn!(kid = %jwk.kid, "Skipping signing key with unexpected algorithm");
        return None;
    }
    let (n, e) = (jwk.n.as_ref()?, jwk.e.as_ref()?);
    DecodingKey::from_rsa_components(n, e).ok()
}

/// `max-age` directive from a Cache-Control header, if any
pub(crate) fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age=")?.parse::<u64>().ok())
        .map(Duration::from_secs)
}
