use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{subject_fingerprint, Claims};
use crate::database::models::{Account, NewAccount};
use crate::database::{bounded, Session, StorageError};

#[derive(Debug, Error)]
pub enum ProvisioningFailure {
    #[error("account storage failed: {0}")]
    Storage(#[from] StorageError),

    /// Insert hit the uniqueness constraint yet no row is visible afterwards
    #[error("account {0} conflicted on insert but could not be read back")]
    ConflictWithoutRow(String),
}

/// Maps verified external identities to local accounts, creating them on
/// first sight. Creation goes through `insert_account_if_absent`, whose
/// uniqueness constraint on the external id is the serialization point for
/// concurrent first logins; the loser of that race re-reads the winner's row.
pub struct UserDirectory {
    operation_timeout: Duration,
}

impl UserDirectory {
    pub fn new(operation_timeout: Duration) -> Self {
        Self { operation_timeout }
    }

    pub async fn resolve(&self, session: &mut dyn Session, claims: &Claims) -> Result<Account, ProvisioningFailure> {
        let limit = self.operation_timeout;

        if let Some(account) = bounded(limit, "find_account", session.find_account(&claims.subject)).await? {
            return Ok(account);
        }

        let candidate = NewAccount::from_claims(claims);
        if let Some(created) = bounded(limit, "insert_account", session.insert_account_if_absent(&candidate)).await? {
            info!(
                subject = %subject_fingerprint(&claims.subject),
                account_id = %created.id,
                tier = %created.subscription_tier,
                "Provisioned account on first login"
            );
            return Ok(created);
        }

        debug!(
            subject = %subject_fingerprint(&claims.subject),
            "Concurrent first login won elsewhere, re-reading account"
        );
        bounded(limit, "find_account", session.find_account(&claims.subject))
            .await?
            .ok_or_else(|| ProvisioningFailure::ConflictWithoutRow(subject_fingerprint(&claims.subject)))
    }
}
