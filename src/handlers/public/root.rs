// handlers/public/root.rs - GET / handler

use serde_json::{json, Value};

use crate::middleware::ApiResponse;

/// GET / - Service identity and endpoint map
pub async fn root_get() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Sector Feed API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Tier-gated sector rotation analysis feed",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "dashboard": "/api/v1/dashboard (bearer token)",
        }
    }))
}
