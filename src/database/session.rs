use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::manager::StorageError;
use super::models::{Account, AnalysisRow, NewAccount};

/// Source of per-request storage sessions.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Lease a session for one request. Dropping it releases the underlying
    /// handle on every exit path, cancellation included.
    async fn session(&self) -> Result<Box<dyn Session>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}

/// Scoped storage handle. Every write is a single atomic statement, so a
/// session that is dropped mid-pipeline never leaves partial state behind.
#[async_trait]
pub trait Session: Send {
    async fn find_account(&mut self, external_id: &str) -> Result<Option<Account>, StorageError>;

    /// Insert unless an account with the same external id exists.
    /// `Ok(None)` means another writer got there first.
    async fn insert_account_if_absent(&mut self, account: &NewAccount) -> Result<Option<Account>, StorageError>;

    /// Rows of the most recent analysis date, rank ascending. Empty when the
    /// repository holds no analysis at all.
    async fn latest_analysis(&mut self) -> Result<Vec<AnalysisRow>, StorageError>;
}

/// Run a storage call under a deadline
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(operation)),
    }
}
