pub mod directory;
pub mod entitlement;
pub mod feed;

pub use directory::{ProvisioningFailure, UserDirectory};
pub use entitlement::{project, ProjectedRow, ProjectionError, Signal, FREE_TIER_ROW_LIMIT};
pub use feed::{Dashboard, FeedError, FeedService, Stage};
