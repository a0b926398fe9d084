use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use super::jwks::KeyCache;
use super::Claims;
use crate::config::IdentityConfig;

/// Firebase-style subject identifiers are capped at this length
const MAX_SUBJECT_LEN: usize = 128;

/// Detailed verification failures. Internal only: these are logged and then
/// collapsed into `AuthFailure` before anything reaches a client.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider not configured: {0} is missing or invalid")]
    NotConfigured(&'static str),

    #[error("malformed token: {0}")]
    Malformed(jsonwebtoken::errors::Error),

    #[error("unexpected signing algorithm {0}")]
    UnexpectedAlgorithm(String),

    #[error("token header carries no key id")]
    MissingKeyId,

    #[error("no signing key with id {0}")]
    UnknownKey(String),

    #[error("signing key fetch failed: {0}")]
    KeyFetch(String),

    #[error("token rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),

    #[error("invalid {0} claim")]
    InvalidClaim(&'static str),
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
}

/// Ready-to-use handle on the external identity provider. Built once at
/// startup and shared by every request.
pub struct IdentityClient {
    keys: KeyCache,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    leeway_secs: u64,
}

impl IdentityClient {
    pub fn init(config: &IdentityConfig) -> Result<Self, ProviderError> {
        if config.project_id.is_empty() {
            return Err(ProviderError::NotConfigured("IDENTITY_PROJECT_ID"));
        }
        url::Url::parse(&config.jwks_url).map_err(|_| ProviderError::NotConfigured("IDENTITY_JWKS_URL"))?;

        let http = reqwest::Client::builder()
            .timeout(config.verify_timeout())
            .build()
            .map_err(|e| ProviderError::KeyFetch(format!("Failed to create HTTP client: {e}")))?;

        let keys = KeyCache::remote(
            config.jwks_url.clone(),
            http,
            std::time::Duration::from_secs(config.jwks_cache_ttl_secs),
        );

        Ok(Self::with_key_cache(config, Algorithm::RS256, keys))
    }

    /// Client that trusts a fixed key set instead of the provider's JWKS
    pub fn with_static_keys(
        config: &IdentityConfig,
        algorithm: Algorithm,
        keys: HashMap<String, DecodingKey>,
    ) -> Self {
        Self::with_key_cache(config, algorithm, KeyCache::fixed(keys))
    }

    fn with_key_cache(config: &IdentityConfig, algorithm: Algorithm, keys: KeyCache) -> Self {
        Self {
            keys,
            algorithm,
            issuer: config.issuer(),
            audience: config.project_id.clone(),
            leeway_secs: config.clock_skew_secs,
        }
    }

    pub async fn verify_id_token(&self, token: &str) -> Result<Claims, ProviderError> {
        let header = decode_header(token).map_err(ProviderError::Malformed)?;
        if header.alg != self.algorithm {
            return Err(ProviderError::UnexpectedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or(ProviderError::MissingKeyId)?;
        let key = self.keys.key(&kid).await?;

        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway_secs;

        let claims = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(ProviderError::Rejected)?
            .claims;

        if claims.sub.is_empty() || claims.sub.len() > MAX_SUBJECT_LEN {
            return Err(ProviderError::InvalidClaim("sub"));
        }
        let now = Utc::now().timestamp();
        if matches!(claims.iat, Some(iat) if iat > now + self.leeway_secs as i64) {
            return Err(ProviderError::InvalidClaim("iat"));
        }
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(ProviderError::InvalidClaim("exp"))?;

        Ok(Claims {
            subject: claims.sub,
            email: claims.email.filter(|email| !email.trim().is_empty()),
            expires_at,
        })
    }
}
