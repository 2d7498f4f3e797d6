//! REST client for the drive API
//!
//! Endpoints (relative to the configured base URL):
//! - `GET    /me/drive/root/children`          top-level listing
//! - `GET    /me/drive/items/{id}/children`    folder listing
//! - `POST   /me/drive/items/{id}/children`    create folder
//! - `PATCH  /me/drive/items/{id}`             rename
//! - `DELETE /me/drive/items/{id}`             delete
//!
//! Listings follow `@odata.nextLink` so callers always receive the complete
//! ordered child list from a single call.

use super::token::TokenSource;
use super::RemoteListing;
use crate::error::DriveError;
use crate::model::{Entry, ListingPage};
use crate::types::ROOT_ID;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drive API client with bearer-token injection
pub struct GraphClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
    page_size: Option<u32>,
}

impl GraphClient {
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, DriveError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DriveError::ConfigError(format!("Invalid API base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DriveError::ConfigError(format!(
                "API base URL cannot carry a path: {}",
                base_url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DriveError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            tokens,
            page_size: None,
        })
    }

    /// Request listings in pages of at most `size` entries
    pub fn with_page_size(mut self, size: Option<u32>) -> Self {
        self.page_size = size.filter(|s| *s > 0);
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn item_url(&self, item_id: &str) -> Url {
        if item_id == ROOT_ID {
            self.endpoint(&["me", "drive", "root"])
        } else {
            self.endpoint(&["me", "drive", "items", item_id])
        }
    }

    fn children_url(&self, item_id: &str) -> Url {
        let mut url = if item_id == ROOT_ID {
            self.endpoint(&["me", "drive", "root", "children"])
        } else {
            self.endpoint(&["me", "drive", "items", item_id, "children"])
        };
        if let Some(size) = self.page_size {
            url.query_pairs_mut().append_pair("$top", &size.to_string());
        }
        url
    }

    /// Send with a bearer token
    ///
    /// A 401 invalidates the token and retries once, unless the token source
    /// has no way to produce a different token.
    async fn execute<F>(&self, build: F) -> Result<reqwest::Response, DriveError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let token = self.tokens.access_token().await?;
        let resp = build().bearer_auth(&token).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Self::check(resp).await;
        }
        if !self.tokens.can_refresh() {
            warn!("Access token rejected and cannot be refreshed");
            return Self::check(resp).await;
        }

        warn!("Access token rejected, retrying with a fresh token");
        self.tokens.invalidate();
        let token = self.tokens.access_token().await?;
        let resp = build().bearer_auth(&token).send().await?;
        Self::check(resp).await
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, DriveError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DriveError::Api {
            status: status.as_u16(),
            message: api_error_message(status, &body),
        })
    }

    async fn list_all(&self, first: Url) -> Result<Vec<Entry>, DriveError> {
        let mut items = Vec::new();
        let mut pages = 0usize;
        let mut next = Some(first);
        while let Some(url) = next.take() {
            let resp = self.execute(|| self.http.get(url.clone())).await?;
            let page: ListingPage = resp
                .json()
                .await
                .map_err(|e| DriveError::Transport(format!("Malformed listing response: {}", e)))?;
            pages += 1;
            items.extend(page.value);
            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    DriveError::Transport(format!("Malformed next page link {}: {}", link, e))
                })?),
                None => None,
            };
        }
        debug!(count = items.len(), pages = pages, "Listing complete");
        Ok(items)
    }

    async fn read_entry(resp: reqwest::Response) -> Result<Entry, DriveError> {
        resp.json()
            .await
            .map_err(|e| DriveError::Transport(format!("Malformed item response: {}", e)))
    }
}

#[async_trait]
impl RemoteListing for GraphClient {
    async fn list_root(&self) -> Result<Vec<Entry>, DriveError> {
        self.list_all(self.children_url(ROOT_ID)).await
    }

    async fn list_children(&self, item_id: &str) -> Result<Vec<Entry>, DriveError> {
        self.list_all(self.children_url(item_id)).await
    }

    async fn delete_item(&self, item_id: &str) -> Result<(), DriveError> {
        let url = self.item_url(item_id);
        self.execute(|| self.http.delete(url.clone())).await?;
        info!(item_id = %item_id, "Deleted item");
        Ok(())
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<Entry, DriveError> {
        let mut url = self.children_url(parent_id);
        url.set_query(None);
        let body = json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });
        let resp = self
            .execute(|| self.http.post(url.clone()).json(&body))
            .await?;
        let entry = Self::read_entry(resp).await?;
        info!(parent_id = %parent_id, item_id = %entry.id, "Created folder");
        Ok(entry)
    }

    async fn rename_item(&self, item_id: &str, new_name: &str) -> Result<Entry, DriveError> {
        let url = self.item_url(item_id);
        let body = json!({ "name": new_name });
        let resp = self
            .execute(|| self.http.patch(url.clone()).json(&body))
            .await?;
        let entry = Self::read_entry(resp).await?;
        info!(item_id = %item_id, "Renamed item");
        Ok(entry)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

/// Message from the store's JSON error body, falling back to the status text
fn api_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) => match (error.code, error.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => fallback(),
        },
        Err(_) => fallback(),
    }
}
