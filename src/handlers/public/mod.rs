pub mod health;
pub mod root;

pub use health::health_get;
pub use root::root_get;
