//! Access token sources for the drive client.

use crate::error::DriveError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Supplies the bearer token injected into every API request
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, DriveError>;

    /// Forget any memoised token so the next request obtains a fresh one
    fn invalidate(&self) {}

    /// Whether `invalidate` can lead to a different token
    fn can_refresh(&self) -> bool {
        false
    }
}

/// Token taken verbatim from configuration or the environment
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, DriveError> {
        if self.token.is_empty() {
            return Err(DriveError::Auth("Access token is empty".to_string()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Token fetched from a companion token server and memoised
///
/// The server answers `GET <endpoint>` with the token response JSON once the
/// user has completed the browser sign-in.
pub struct TokenServer {
    http: reqwest::Client,
    endpoint: String,
    cached: RwLock<Option<String>>,
}

impl TokenServer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DriveError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriveError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            cached: RwLock::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self) -> Result<String, DriveError> {
        debug!(endpoint = %self.endpoint, "Requesting access token");
        let resp = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| DriveError::Auth(format!("Token server unreachable: {}", e)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!(
                "Token server returned {}: {}",
                status,
                body.trim()
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| DriveError::Auth(format!("Token response parse failed: {}", e)))?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DriveError::Auth("Token response has no access_token".to_string()))
    }
}

#[async_trait]
impl TokenSource for TokenServer {
    async fn access_token(&self) -> Result<String, DriveError> {
        let cached = self.cached.read().clone();
        if let Some(token) = cached {
            return Ok(token);
        }
        let token = self.fetch().await?;
        *self.cached.write() = Some(token.clone());
        info!("Obtained access token from token server");
        Ok(token)
    }

    fn invalidate(&self) {
        *self.cached.write() = None;
    }

    fn can_refresh(&self) -> bool {
        true
    }
}
