use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use super::models::{Account, AnalysisRow, NewAccount};
use super::session::{Session, Storage};
use crate::config::DatabaseConfig;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Storage unavailable: {0}")]
    Unavailable(sqlx::Error),

    #[error("Storage operation timed out: {0}")]
    Timeout(&'static str),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(err)
            }
            other => StorageError::Sqlx(other),
        }
    }
}

/// Builds the shared connection pool
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StorageError> {
        let raw = std::env::var("DATABASE_URL").map_err(|_| StorageError::ConfigMissing("DATABASE_URL"))?;
        let connection_string = Self::validate_url(&raw)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&connection_string)
            .await?;

        info!(max_connections = config.max_connections, "Created database pool");
        Ok(pool)
    }

    fn validate_url(raw: &str) -> Result<String, StorageError> {
        let url = url::Url::parse(raw).map_err(|_| StorageError::InvalidDatabaseUrl)?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(url.into()),
            _ => Err(StorageError::InvalidDatabaseUrl),
        }
    }
}

/// PostgreSQL-backed storage
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn session(&self) -> Result<Box<dyn Session>, StorageError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgSession { conn }))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A leased pool connection; returned to the pool when dropped
pub struct PgSession {
    conn: PoolConnection<Postgres>,
}

const ACCOUNT_COLUMNS: &str = "id, external_id, email, subscription_tier, created_at";

#[async_trait]
impl Session for PgSession {
    async fn find_account(&mut self, external_id: &str) -> Result<Option<Account>, StorageError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE external_id = $1");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(external_id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(account)
    }

    async fn insert_account_if_absent(&mut self, account: &NewAccount) -> Result<Option<Account>, StorageError> {
        let query = format!(
            r#"
            INSERT INTO accounts (id, external_id, email, subscription_tier, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, Account>(&query)
            .bind(account.id)
            .bind(&account.external_id)
            .bind(&account.email)
            .bind(account.subscription_tier.as_str())
            .bind(account.created_at)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(inserted)
    }

    async fn latest_analysis(&mut self) -> Result<Vec<AnalysisRow>, StorageError> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT analysis_date, rank, sector, score,
                   market_context, phase_and_health, rationale_and_elliott_wave,
                   risk_and_volume_profile, execution_protocol, top_3_tickers,
                   sector_portfolio_percentage, week_targets
            FROM sector_rotations
            WHERE analysis_date = (SELECT MAX(analysis_date) FROM sector_rotations)
            ORDER BY rank ASC
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(rows)
    }
}
