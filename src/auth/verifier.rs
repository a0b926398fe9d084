use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::provider::IdentityClient;
use super::{AuthFailure, Claims, TokenVerifier};

/// Token verifier backed by the identity provider, fail-closed: every
/// provider error and every timeout becomes the same `AuthFailure`.
pub struct ProviderTokenVerifier {
    client: Arc<IdentityClient>,
    timeout: Duration,
}

impl ProviderTokenVerifier {
    pub fn new(client: Arc<IdentityClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl TokenVerifier for ProviderTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        let token = token.trim();
        if token.is_empty() {
            tracing::debug!("Rejecting empty bearer token");
            return Err(AuthFailure);
        }

        match timeout(self.timeout, self.client.verify_id_token(token)).await {
            Ok(Ok(claims)) => Ok(claims),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Identity token verification failed");
                Err(AuthFailure)
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Identity provider timed out");
                Err(AuthFailure)
            }
        }
    }
}
