use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use super::directory::{ProvisioningFailure, UserDirectory};
use super::entitlement::{project, ProjectedRow, ProjectionError};
use crate::auth::{subject_fingerprint, AuthFailure, TokenVerifier};
use crate::database::models::SubscriptionTier;
use crate::database::{bounded, Storage, StorageError};

/// Where a request is in the pipeline. Failures are reported with the last
/// stage reached; serializing a projected dashboard is the handler's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unauthenticated,
    Authenticated,
    Provisioned,
    Fetched,
    Projected,
}

/// Terminal outcomes other than success. None are retried here.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningFailure),

    #[error("no analysis data available")]
    NoDataAvailable,

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("analysis repository failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub tier: SubscriptionTier,
    pub rows: Vec<ProjectedRow>,
}

/// Per-request orchestration: verify, resolve-or-create the account, fetch
/// the latest ranked rows, project them for the account's tier.
pub struct FeedService {
    verifier: Arc<dyn TokenVerifier>,
    storage: Arc<dyn Storage>,
    directory: UserDirectory,
    operation_timeout: Duration,
}

impl FeedService {
    pub fn new(verifier: Arc<dyn TokenVerifier>, storage: Arc<dyn Storage>, operation_timeout: Duration) -> Self {
        Self {
            verifier,
            storage,
            directory: UserDirectory::new(operation_timeout),
            operation_timeout,
        }
    }

    pub async fn dashboard(&self, token: &str) -> Result<Dashboard, FeedError> {
        let mut stage = Stage::Unauthenticated;
        let result = self.run(token, &mut stage).await;

        match &result {
            Ok(dashboard) => debug!(?stage, tier = %dashboard.tier, rows = dashboard.rows.len(), "Dashboard projected"),
            Err(FeedError::Auth(_)) => debug!(?stage, "Request rejected: authentication failed"),
            Err(FeedError::NoDataAvailable) => info!(?stage, "No analysis data available"),
            Err(e) => error!(?stage, error = %e, "Dashboard request failed"),
        }
        result
    }

    async fn run(&self, token: &str, stage: &mut Stage) -> Result<Dashboard, FeedError> {
        let claims = self.verifier.verify(token).await?;
        *stage = Stage::Authenticated;

        // The session lives until the rows are fetched and is released on
        // every path out of this block, including cancellation.
        let (account, rows) = {
            let mut session = bounded(self.operation_timeout, "acquire_session", self.storage.session())
                .await
                .map_err(ProvisioningFailure::from)?;

            let account = self.directory.resolve(session.as_mut(), &claims).await?;
            *stage = Stage::Provisioned;

            let rows = bounded(self.operation_timeout, "latest_analysis", session.latest_analysis()).await?;
            (account, rows)
        };

        if rows.is_empty() {
            return Err(FeedError::NoDataAvailable);
        }
        *stage = Stage::Fetched;

        let tier = account.subscription_tier;
        let projected = project(&rows, tier)?;
        *stage = Stage::Projected;

        debug!(
            subject = %subject_fingerprint(&claims.subject),
            account_id = %account.id,
            %tier,
            "Resolved dashboard for account"
        );
        Ok(Dashboard { tier, rows: projected })
    }
}
