#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sector_feed_api::auth::{AuthFailure, Claims, TokenVerifier};
use sector_feed_api::config::IdentityConfig;
use sector_feed_api::database::{Account, AnalysisRow, NewAccount, Session, Storage, StorageError, SubscriptionTier};

pub const PROJECT_ID: &str = "sector-feed-test";

pub fn identity_config() -> IdentityConfig {
    IdentityConfig {
        project_id: PROJECT_ID.to_string(),
        issuer_prefix: "https://securetoken.google.com/".to_string(),
        jwks_url: "https://keys.invalid/jwks".to_string(),
        verify_timeout_ms: 1_000,
        jwks_cache_ttl_secs: 3_600,
        clock_skew_secs: 0,
    }
}

pub fn row(date: NaiveDate, rank: i32, sector: &str) -> AnalysisRow {
    AnalysisRow {
        analysis_date: date,
        rank,
        sector: sector.to_string(),
        score: Some(90.0 - rank as f64),
        market_context: Some(format!("{sector} context")),
        phase_and_health: Some("Phase: Impulse".to_string()),
        rationale_and_elliott_wave: Some("Wave 3".to_string()),
        risk_and_volume_profile: Some("Beta: 1.1".to_string()),
        execution_protocol: Some("Long on pullbacks".to_string()),
        top_3_tickers: Some("AAA, BBB, CCC".to_string()),
        sector_portfolio_percentage: Some(5.0),
        week_targets: Some("Upside: +4%".to_string()),
    }
}

pub fn week(date: NaiveDate, ranks: impl IntoIterator<Item = i32>) -> Vec<AnalysisRow> {
    ranks.into_iter().map(|rank| row(date, rank, &format!("SECTOR-{rank}"))).collect()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    analysis: Vec<AnalysisRow>,
    down: bool,
}

/// Minimal storage double: the insert is atomic under one lock, like a
/// unique index on external_id
#[derive(Clone, Default)]
pub struct FakeStorage {
    tables: Arc<Mutex<Tables>>,
}

impl FakeStorage {
    pub fn with_rows(rows: Vec<AnalysisRow>) -> Self {
        let storage = Self::default();
        storage.tables.lock().unwrap().analysis = rows;
        storage
    }

    pub fn upgrade(&self, external_id: &str) {
        if let Some(account) = self.tables.lock().unwrap().accounts.get_mut(external_id) {
            account.subscription_tier = SubscriptionTier::Pro;
        }
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.tables.lock().unwrap().accounts.values().cloned().collect()
    }

    pub fn take_down(&self) {
        self.tables.lock().unwrap().down = true;
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StorageError> {
        let tables = self.tables.lock().unwrap();
        if tables.down {
            return Err(StorageError::Unavailable(sqlx::Error::PoolClosed));
        }
        Ok(tables)
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn session(&self) -> Result<Box<dyn Session>, StorageError> {
        drop(self.tables()?);
        Ok(Box::new(self.clone()))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.tables().map(drop)
    }
}

#[async_trait]
impl Session for FakeStorage {
    async fn find_account(&mut self, external_id: &str) -> Result<Option<Account>, StorageError> {
        tokio::task::yield_now().await;
        Ok(self.tables()?.accounts.get(external_id).cloned())
    }

    async fn insert_account_if_absent(&mut self, account: &NewAccount) -> Result<Option<Account>, StorageError> {
        tokio::task::yield_now().await;
        let mut tables = self.tables()?;
        if tables.accounts.contains_key(&account.external_id) {
            return Ok(None);
        }
        let created = Account {
            id: account.id,
            external_id: account.external_id.clone(),
            email: account.email.clone(),
            subscription_tier: account.subscription_tier,
            created_at: account.created_at,
        };
        tables.accounts.insert(created.external_id.clone(), created.clone());
        Ok(Some(created))
    }

    async fn latest_analysis(&mut self) -> Result<Vec<AnalysisRow>, StorageError> {
        let tables = self.tables()?;
        let Some(latest) = tables.analysis.iter().map(|row| row.analysis_date).max() else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<_> = tables.analysis.iter().filter(|row| row.analysis_date == latest).cloned().collect();
        rows.sort_by_key(|row| row.rank);
        Ok(rows)
    }
}

/// Treats the token text as the subject; "bad" tokens are rejected
pub struct SubjectVerifier;

#[async_trait]
impl TokenVerifier for SubjectVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        if token.is_empty() || token.starts_with("bad") {
            return Err(AuthFailure);
        }
        Ok(Claims {
            subject: token.to_string(),
            email: Some(format!("{token}@example.com")),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}
