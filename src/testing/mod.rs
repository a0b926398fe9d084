//! In-memory fakes for unit tests: storage with failure and latency knobs,
//! and a verifier that accepts a fixed set of tokens.

pub mod identity;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{AuthFailure, Claims, TokenVerifier};
use crate::database::models::{Account, AnalysisRow, NewAccount, SubscriptionTier};
use crate::database::{Session, Storage, StorageError};

pub fn claims_for(subject: &str, email: Option<&str>) -> Claims {
    Claims {
        subject: subject.to_string(),
        email: email.map(str::to_string),
        expires_at: Utc::now() + ChronoDuration::hours(1),
    }
}

/// Fully populated rows for the given ranks on 2025-01-06
pub fn analysis_rows(ranks: &[i32]) -> Vec<AnalysisRow> {
    let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    ranks
        .iter()
        .map(|&rank| AnalysisRow {
            analysis_date: date,
            rank,
            sector: format!("SECTOR {rank}"),
            score: Some(100.0 - rank as f64),
            market_context: Some("context".to_string()),
            phase_and_health: Some("Phase: Impulse".to_string()),
            rationale_and_elliott_wave: Some("Wave 3".to_string()),
            risk_and_volume_profile: Some("Beta: 1.0".to_string()),
            execution_protocol: Some("Long on pullbacks".to_string()),
            top_3_tickers: Some("AAA, BBB, CCC".to_string()),
            sector_portfolio_percentage: Some(10.0),
            week_targets: Some("Upside: +5%".to_string()),
        })
        .collect()
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    analysis: Vec<AnalysisRow>,
    hidden_lookups: usize,
    unavailable: bool,
}

/// Storage whose insert is atomic under a lock, mirroring a unique index
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
    delay: Option<Duration>,
    yielding: bool,
}

impl MemoryStorage {
    pub fn with_analysis(rows: Vec<AnalysisRow>) -> Self {
        let storage = Self::default();
        storage.state.lock().unwrap().analysis = rows;
        storage
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Yield to the scheduler around every call so concurrent tasks interleave
    pub fn with_yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    pub fn insert_account(&self, external_id: &str, email: Option<&str>, tier: SubscriptionTier) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            email: email.map(str::to_string),
            subscription_tier: tier,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(external_id.to_string(), account.clone());
        account
    }

    pub fn set_tier(&self, external_id: &str, tier: SubscriptionTier) {
        if let Some(account) = self.state.lock().unwrap().accounts.get_mut(external_id) {
            account.subscription_tier = tier;
        }
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    /// Make the next `n` account lookups miss
    pub fn hide_next_lookups(&self, n: usize) {
        self.state.lock().unwrap().hidden_lookups = n;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.yielding {
            tokio::task::yield_now().await;
        }
    }

    fn check(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(StorageError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(state)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn session(&self) -> Result<Box<dyn Session>, StorageError> {
        drop(self.check()?);
        Ok(Box::new(self.clone()))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.pause().await;
        self.check().map(drop)
    }
}

#[async_trait]
impl Session for MemoryStorage {
    async fn find_account(&mut self, external_id: &str) -> Result<Option<Account>, StorageError> {
        self.pause().await;
        let mut state = self.check()?;
        if state.hidden_lookups > 0 {
            state.hidden_lookups -= 1;
            return Ok(None);
        }
        Ok(state.accounts.get(external_id).cloned())
    }

    async fn insert_account_if_absent(&mut self, account: &NewAccount) -> Result<Option<Account>, StorageError> {
        self.pause().await;
        let mut state = self.check()?;
        if state.accounts.contains_key(&account.external_id) {
            return Ok(None);
        }
        let created = Account {
            id: account.id,
            external_id: account.external_id.clone(),
            email: account.email.clone(),
            subscription_tier: account.subscription_tier,
            created_at: account.created_at,
        };
        state.accounts.insert(created.external_id.clone(), created.clone());
        Ok(Some(created))
    }

    async fn latest_analysis(&mut self) -> Result<Vec<AnalysisRow>, StorageError> {
        self.pause().await;
        let state = self.check()?;
        let Some(latest) = state.analysis.iter().map(|row| row.analysis_date).max() else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<_> = state
            .analysis
            .iter()
            .filter(|row| row.analysis_date == latest)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        Ok(rows)
    }
}

/// Accepts exactly the tokens it was built with
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticVerifier {
    pub fn accepting(mut self, token: &str, claims: Claims) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        self.tokens.get(token).cloned().ok_or(AuthFailure)
    }
}
