use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::database::models::AnalysisRow;

/// One entry of a seed file. The analysis date comes from the command line
/// and the signal is always derived, so neither appears here.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRow {
    pub rank: i32,
    pub sector: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub market_context: Option<String>,
    #[serde(default)]
    pub phase_and_health: Option<String>,
    #[serde(default)]
    pub rationale_and_elliott_wave: Option<String>,
    #[serde(default)]
    pub risk_and_volume_profile: Option<String>,
    #[serde(default)]
    pub execution_protocol: Option<String>,
    #[serde(default)]
    pub top_3_tickers: Option<String>,
    #[serde(default)]
    pub sector_portfolio_percentage: Option<f64>,
    #[serde(default)]
    pub week_targets: Option<String>,
}

impl SeedRow {
    pub fn into_row(self, analysis_date: NaiveDate) -> AnalysisRow {
        AnalysisRow {
            analysis_date,
            rank: self.rank,
            sector: self.sector,
            score: self.score,
            market_context: self.market_context,
            phase_and_health: self.phase_and_health,
            rationale_and_elliott_wave: self.rationale_and_elliott_wave,
            risk_and_volume_profile: self.risk_and_volume_profile,
            execution_protocol: self.execution_protocol,
            top_3_tickers: self.top_3_tickers,
            sector_portfolio_percentage: self.sector_portfolio_percentage,
            week_targets: self.week_targets,
        }
    }
}

pub async fn handle(file: PathBuf, date: Option<NaiveDate>, output_format: OutputFormat) -> anyhow::Result<()> {
    let analysis_date = date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let rows = load_rows(&file, analysis_date)?;

    let pool = connect().await?;
    let replaced = replace_date(&pool, analysis_date, &rows).await;
    pool.close().await;
    let replaced = replaced?;

    output_success(
        &output_format,
        &format!("Seeded {} rows for {} (replaced {})", rows.len(), analysis_date, replaced),
        Some(json!({
            "analysis_date": analysis_date,
            "inserted": rows.len(),
            "replaced": replaced
        })),
    )
}

/// Read, validate and date-stamp a seed file
pub fn load_rows(path: &Path, analysis_date: NaiveDate) -> anyhow::Result<Vec<AnalysisRow>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut rows: Vec<SeedRow> =
        serde_json::from_str(&content).with_context(|| format!("{} is not a JSON array of rows", path.display()))?;

    rows.sort_by_key(|row| row.rank);
    validate_rows(&rows)?;
    Ok(rows.into_iter().map(|row| row.into_row(analysis_date)).collect())
}

/// Ranks must be exactly 1..=N once each, sectors non-empty. Expects rows
/// sorted by rank.
pub fn validate_rows(rows: &[SeedRow]) -> anyhow::Result<()> {
    if rows.is_empty() {
        bail!("seed file contains no rows");
    }
    for (expected, row) in (1..).zip(rows) {
        if row.rank != expected {
            bail!("ranks must run 1..={} without gaps or repeats; found {} where {} was expected", rows.len(), row.rank, expected);
        }
        if row.sector.trim().is_empty() {
            bail!("row with rank {} has an empty sector", row.rank);
        }
    }
    Ok(())
}

/// Swap one date's rows in a single transaction so readers never see a
/// half-written ranking. Returns how many rows were removed.
async fn replace_date(pool: &sqlx::PgPool, analysis_date: NaiveDate, rows: &[AnalysisRow]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;

    let replaced = sqlx::query("DELETE FROM sector_rotations WHERE analysis_date = $1")
        .bind(analysis_date)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO sector_rotations (
                analysis_date, rank, sector, score, market_context, phase_and_health,
                rationale_and_elliott_wave, risk_and_volume_profile, execution_protocol,
                top_3_tickers, sector_portfolio_percentage, week_targets
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.analysis_date)
        .bind(row.rank)
        .bind(&row.sector)
        .bind(row.score)
        .bind(&row.market_context)
        .bind(&row.phase_and_health)
        .bind(&row.rationale_and_elliott_wave)
        .bind(&row.risk_and_volume_profile)
        .bind(&row.execution_protocol)
        .bind(&row.top_3_tickers)
        .bind(row.sector_portfolio_percentage)
        .bind(&row.week_targets)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert rank {}", row.rank))?;
    }

    tx.commit().await?;
    tracing::info!(%analysis_date, inserted = rows.len(), replaced, "Replaced sector rotation rows");
    Ok(replaced)
}
