//! Tier-based projection of ranked analysis rows.
//!
//! PRO subscribers see every row with every field. FREE subscribers see the
//! top `FREE_TIER_ROW_LIMIT` rows reduced to date, rank, sector, score and
//! signal. The projection is pure: same rows and tier, same output.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::database::models::{AnalysisRow, SubscriptionTier};

pub const FREE_TIER_ROW_LIMIT: usize = 4;

/// Highest rank still labelled Overweight
pub const OVERWEIGHT_MAX_RANK: i32 = 30;
/// Lowest rank labelled Underweight
pub const UNDERWEIGHT_MIN_RANK: i32 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Overweight,
    Neutral,
    Underweight,
}

impl Signal {
    pub fn from_rank(rank: i32) -> Self {
        if rank <= OVERWEIGHT_MAX_RANK {
            Signal::Overweight
        } else if rank >= UNDERWEIGHT_MIN_RANK {
            Signal::Underweight
        } else {
            Signal::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Overweight => "Overweight",
            Signal::Neutral => "Neutral",
            Signal::Underweight => "Underweight",
        }
    }
}

/// Rows that would produce a corrupted view. Fatal to the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("rank {rank} for sector {sector} is outside the ranking domain")]
    RankOutOfDomain { rank: i32, sector: String },

    #[error("rank {rank} follows rank {previous}; rows must be strictly rank-ascending")]
    OutOfOrder { previous: i32, rank: i32 },

    #[error("rows span analysis dates {first} and {other}")]
    MixedDates { first: NaiveDate, other: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeRow {
    pub analysis_date: NaiveDate,
    pub rank: i32,
    pub sector: String,
    pub score: Option<f64>,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProRow {
    #[serde(flatten)]
    pub summary: FreeRow,
    pub market_context: Option<String>,
    pub phase_and_health: Option<String>,
    pub rationale_and_elliott_wave: Option<String>,
    pub risk_and_volume_profile: Option<String>,
    pub execution_protocol: Option<String>,
    pub top_3_tickers: Option<String>,
    pub sector_portfolio_percentage: Option<f64>,
    pub week_targets: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProjectedRow {
    Free(FreeRow),
    Pro(ProRow),
}

impl ProjectedRow {
    pub fn rank(&self) -> i32 {
        self.summary().rank
    }

    pub fn signal(&self) -> Signal {
        self.summary().signal
    }

    pub fn summary(&self) -> &FreeRow {
        match self {
            ProjectedRow::Free(row) => row,
            ProjectedRow::Pro(row) => &row.summary,
        }
    }
}

fn summarize(row: &AnalysisRow) -> FreeRow {
    FreeRow {
        analysis_date: row.analysis_date,
        rank: row.rank,
        sector: row.sector.clone(),
        score: row.score,
        signal: Signal::from_rank(row.rank),
    }
}

fn expand(row: &AnalysisRow) -> ProRow {
    ProRow {
        summary: summarize(row),
        market_context: row.market_context.clone(),
        phase_and_health: row.phase_and_health.clone(),
        rationale_and_elliott_wave: row.rationale_and_elliott_wave.clone(),
        risk_and_volume_profile: row.risk_and_volume_profile.clone(),
        execution_protocol: row.execution_protocol.clone(),
        top_3_tickers: row.top_3_tickers.clone(),
        sector_portfolio_percentage: row.sector_portfolio_percentage,
        week_targets: row.week_targets.clone(),
    }
}

fn check_rows(rows: &[AnalysisRow]) -> Result<(), ProjectionError> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let mut previous: Option<i32> = None;
    for row in rows {
        if row.rank < 1 {
            return Err(ProjectionError::RankOutOfDomain {
                rank: row.rank,
                sector: row.sector.clone(),
            });
        }
        if row.analysis_date != first.analysis_date {
            return Err(ProjectionError::MixedDates {
                first: first.analysis_date,
                other: row.analysis_date,
            });
        }
        if let Some(previous) = previous {
            if row.rank <= previous {
                return Err(ProjectionError::OutOfOrder { previous, rank: row.rank });
            }
        }
        previous = Some(row.rank);
    }
    Ok(())
}

/// Shape `rows` for a subscriber on `tier`, preserving input order
pub fn project(rows: &[AnalysisRow], tier: SubscriptionTier) -> Result<Vec<ProjectedRow>, ProjectionError> {
    check_rows(rows)?;

    let projected = match tier {
        SubscriptionTier::Pro => rows.iter().map(|row| ProjectedRow::Pro(expand(row))).collect(),
        SubscriptionTier::Free => rows
            .iter()
            .take(FREE_TIER_ROW_LIMIT)
            .map(|row| ProjectedRow::Free(summarize(row)))
            .collect(),
    };
    Ok(projected)
}
