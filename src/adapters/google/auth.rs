//! Service account OAuth for Google APIs.
//!
//! A signed RS256 assertion is exchanged for a bearer token at the key's
//! `token_uri`. Tokens are cached and refreshed shortly before they expire.

use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
/// Full Drive access, needed to share created files.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GoogleAuthError {
    #[error("Service account key unreadable: {0}")]
    KeyUnreadable(String),

    #[error("Invalid service account key: {0}")]
    InvalidKey(String),

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("Token request rejected ({status}): {body}")]
    TokenRejected { status: u16, body: String },
}

/// The parts of a service account JSON key we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: Secret<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, GoogleAuthError> {
        serde_json::from_str(json).map_err(|e| GoogleAuthError::InvalidKey(e.to_string()))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GoogleAuthError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GoogleAuthError::KeyUnreadable(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Assertion claims.
#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Cached bearer token with expiry tracking.
struct CachedToken {
    token: Secret<String>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

/// Bearer token provider for one service account.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    scope: String,
    http: Client,
    cache: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Parses the private key up front so a bad key fails at startup.
    pub fn new(key: ServiceAccountKey, scopes: &[&str], http: Client) -> Result<Self, GoogleAuthError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
            .map_err(|e| GoogleAuthError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            signing_key,
            scope: scopes.join(" "),
            http,
            cache: RwLock::new(None),
        })
    }

    /// The HTTP client shared with the API adapters.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A valid bearer token, fetching a new one when the cached one is stale.
    pub async fn access_token(&self) -> Result<String, GoogleAuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
                return Ok(cached.token.expose_secret().clone());
            }
        }

        let mut cache = self.cache.write().await;
        // another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.token.expose_secret().clone());
        }

        let response = self.fetch_token().await?;
        tracing::debug!(
            account = %self.key.client_email,
            expires_in = response.expires_in,
            "Google access token refreshed"
        );
        let token = response.access_token.clone();
        *cache = Some(CachedToken {
            token: Secret::new(response.access_token),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(token)
    }

    fn assertion(&self, now: i64) -> Result<String, GoogleAuthError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| GoogleAuthError::InvalidKey(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<TokenResponse, GoogleAuthError> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GoogleAuthError::TokenRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Google token endpoint rejected the assertion");
            return Err(GoogleAuthError::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GoogleAuthError::TokenRequest(format!("Unexpected token response: {}", e)))
    }
}
