use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::Claims;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "FREE",
            SubscriptionTier::Pro => "PRO",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown subscription tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for SubscriptionTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(SubscriptionTier::Free),
            "PRO" => Ok(SubscriptionTier::Pro),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

impl TryFrom<String> for SubscriptionTier {
    type Error = UnknownTier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Local subscriber record, one per external identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for just-in-time provisioning
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: claims.subject.clone(),
            email: claims.email.clone(),
            subscription_tier: SubscriptionTier::Free,
            created_at: Utc::now(),
        }
    }
}
