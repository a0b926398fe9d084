use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
    /// Upper bound on any single storage call made while serving a request
    pub operation_timeout_ms: u64,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub project_id: String,
    pub issuer_prefix: String,
    pub jwks_url: String,
    pub verify_timeout_ms: u64,
    pub jwks_cache_ttl_secs: u64,
    pub clock_skew_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

const DEFAULT_ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_OPERATION_TIMEOUT_MS") {
            self.database.operation_timeout_ms = v.parse().unwrap_or(self.database.operation_timeout_ms);
        }
        if let Ok(v) = env::var("DATABASE_AUTO_MIGRATE") {
            self.database.auto_migrate = v.parse().unwrap_or(self.database.auto_migrate);
        }

        // Identity provider overrides
        if let Ok(v) = env::var("IDENTITY_PROJECT_ID") {
            self.identity.project_id = v.trim().to_string();
        }
        if let Ok(v) = env::var("IDENTITY_ISSUER_PREFIX") {
            self.identity.issuer_prefix = v;
        }
        if let Ok(v) = env::var("IDENTITY_JWKS_URL") {
            self.identity.jwks_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_VERIFY_TIMEOUT_MS") {
            self.identity.verify_timeout_ms = v.parse().unwrap_or(self.identity.verify_timeout_ms);
        }
        if let Ok(v) = env::var("IDENTITY_JWKS_CACHE_TTL_SECS") {
            self.identity.jwks_cache_ttl_secs = v.parse().unwrap_or(self.identity.jwks_cache_ttl_secs);
        }
        if let Ok(v) = env::var("IDENTITY_CLOCK_SKEW_SECS") {
            self.identity.clock_skew_secs = v.parse().unwrap_or(self.identity.clock_skew_secs);
        }

        // API overrides
        if let Some(port) = env::var("API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn identity_defaults(verify_timeout_ms: u64) -> IdentityConfig {
        IdentityConfig {
            project_id: String::new(),
            issuer_prefix: DEFAULT_ISSUER_PREFIX.to_string(),
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            verify_timeout_ms,
            jwks_cache_ttl_secs: 3600,
            clock_skew_secs: 60,
        }
    }

    pub(crate) fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                operation_timeout_ms: 10_000,
                auto_migrate: true,
            },
            identity: Self::identity_defaults(10_000),
            api: ApiConfig {
                port: 8000,
                request_timeout_secs: 30,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    pub(crate) fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                operation_timeout_ms: 5_000,
                auto_migrate: true,
            },
            identity: Self::identity_defaults(5_000),
            api: ApiConfig {
                port: 8000,
                request_timeout_secs: 15,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    pub(crate) fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                operation_timeout_ms: 3_000,
                auto_migrate: false,
            },
            identity: Self::identity_defaults(3_000),
            api: ApiConfig {
                port: 8000,
                request_timeout_secs: 10,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

impl DatabaseConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl IdentityConfig {
    /// Expected `iss` claim for tokens minted for this project
    pub fn issuer(&self) -> String {
        format!("{}{}", self.issuer_prefix, self.project_id)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
