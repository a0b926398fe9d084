pub mod account;
pub mod analysis;

pub use account::{Account, NewAccount, SubscriptionTier, UnknownTier};
pub use analysis::AnalysisRow;
