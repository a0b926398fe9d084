pub mod auth;
pub mod response;

pub use auth::{bearer_token_middleware, BearerToken};
pub use response::ApiResponse;
