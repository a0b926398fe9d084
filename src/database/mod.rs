pub mod manager;
pub mod models;
pub mod schema;
pub mod session;

pub use manager::{DatabaseManager, PgStorage, StorageError};
pub use models::{Account, AnalysisRow, NewAccount, SubscriptionTier};
pub use session::{bounded, Session, Storage};
