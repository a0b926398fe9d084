pub mod jwks;
pub mod provider;
pub mod verifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

pub use provider::{IdentityClient, ProviderError};
pub use verifier::ProviderTokenVerifier;

/// Verified identity for the duration of one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Uniform rejection for every token problem. Carries no cause on purpose;
/// the cause is logged where it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("authentication failed")]
pub struct AuthFailure;

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthFailure>;
}

/// Short stable digest of an external identity, safe to put in logs
pub fn subject_fingerprint(subject: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..12].to_string()
}
