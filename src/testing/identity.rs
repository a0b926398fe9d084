//! Local stand-ins for the identity provider: an RS256 signing key, a JWKS
//! endpoint that counts its fetches, and endpoints that fail or never answer.

use axum::{http::header, http::StatusCode, routing::get, Router};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::{AppConfig, IdentityConfig};

pub const TEST_KEY_ID: &str = "test-key";
pub const TEST_PROJECT_ID: &str = "sector-feed";

const TEST_KEY_PEM: &str = include_str!("../../fixtures/identity_test_key.pem");
const TEST_JWKS: &str = include_str!("../../fixtures/identity_test_jwks.json");

/// Identity settings for the test project, pointed at `jwks_url`
pub fn identity_for(jwks_url: &str) -> IdentityConfig {
    let mut identity = AppConfig::development().identity;
    identity.project_id = TEST_PROJECT_ID.to_string();
    identity.jwks_url = jwks_url.to_string();
    identity.clock_skew_secs = 0;
    identity
}

/// A valid ID token for `subject`, signed with the fixture RSA key
pub fn sign_rs256(kid: &str, subject: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": format!("https://securetoken.google.com/{TEST_PROJECT_ID}"),
        "aud": TEST_PROJECT_ID,
        "sub": subject,
        "iat": now - 10,
        "exp": now + 600,
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

/// JWKS endpoint on a loopback port
pub struct KeyServer {
    pub url: String,
    fetches: Arc<AtomicUsize>,
}

impl KeyServer {
    /// Serves the fixture key set with the given Cache-Control value. Each
    /// fetch is slowed slightly so concurrent cold-cache callers overlap.
    pub async fn serving(cache_control: &'static str) -> Self {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let router = Router::new().route(
            "/jwks",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    (
                        [(header::CACHE_CONTROL, cache_control), (header::CONTENT_TYPE, "application/json")],
                        TEST_JWKS,
                    )
                }
            }),
        );
        Self::start(router, fetches).await
    }

    /// Answers every fetch with `status`
    pub async fn failing(status: StatusCode) -> Self {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let router = Router::new().route(
            "/jwks",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, "key service unavailable")
                }
            }),
        );
        Self::start(router, fetches).await
    }

    async fn start(router: Router, fetches: Arc<AtomicUsize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/jwks", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self { url, fetches }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

/// Accepts connections and never writes a byte back
pub async fn silent_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/jwks", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    url
}

/// A loopback address nothing is listening on
pub async fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/jwks", listener.local_addr().unwrap());
    drop(listener);
    url
}
