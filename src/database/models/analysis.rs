use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One ranked sector entry for an analysis date. Written by the ingestion
/// job, read-only to the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AnalysisRow {
    pub analysis_date: NaiveDate,
    pub rank: i32,
    pub sector: String,
    pub score: Option<f64>,
    pub market_context: Option<String>,
    pub phase_and_health: Option<String>,
    pub rationale_and_elliott_wave: Option<String>,
    pub risk_and_volume_profile: Option<String>,
    pub execution_protocol: Option<String>,
    pub top_3_tickers: Option<String>,
    pub sector_portfolio_percentage: Option<f64>,
    pub week_targets: Option<String>,
}
