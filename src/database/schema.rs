use sqlx::PgPool;
use tracing::info;

use super::manager::StorageError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id UUID PRIMARY KEY,
        external_id TEXT NOT NULL UNIQUE,
        email TEXT,
        subscription_tier TEXT NOT NULL DEFAULT 'FREE'
            CHECK (subscription_tier IN ('FREE', 'PRO')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sector_rotations (
        id BIGSERIAL PRIMARY KEY,
        analysis_date DATE NOT NULL DEFAULT CURRENT_DATE,
        rank INTEGER NOT NULL CHECK (rank >= 1),
        sector TEXT NOT NULL,
        score DOUBLE PRECISION,
        market_context TEXT,
        phase_and_health TEXT,
        rationale_and_elliott_wave TEXT,
        risk_and_volume_profile TEXT,
        execution_protocol TEXT,
        top_3_tickers TEXT,
        sector_portfolio_percentage DOUBLE PRECISION,
        week_targets TEXT,
        UNIQUE (analysis_date, rank)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sector_rotations_sector_idx ON sector_rotations (sector)",
];

/// Idempotently create the tables the feed reads and writes
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!("Database schema is up to date");
    Ok(())
}
