//! Route deep links from the map backend.
//!
//! The backend turns a free-text destination into an `nmap://` link for the
//! Naver Map app.

use crate::response::ChatResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://yeollimi-backend-5knyei6kxa-uc.a.run.app/";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map backend returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("map backend unreachable: {0}")]
    Network(String),

    #[error("map backend returned a non-navigation link: {0}")]
    InvalidLink(String),
}

impl From<reqwest::Error> for MapError {
    fn from(err: reqwest::Error) -> Self {
        MapError::Network(err.to_string())
    }
}

/// Optional origin hint; the backend assumes the current location otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Serialize)]
struct MaplinkRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<&'a LocationHint>,
}

#[derive(Deserialize)]
struct MaplinkResponse {
    url: String,
    #[serde(default)]
    source: Option<String>,
}

#[async_trait]
pub trait RouteFinder: Send + Sync {
    /// Deep link for `query`. Only `nmap://` links are returned as success.
    async fn maplink(&self, query: &str, current: Option<&LocationHint>) -> Result<String, MapError>;
}

pub struct MapClient {
    client: reqwest::Client,
    endpoint: String,
}

impl MapClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MapError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/maplink", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl RouteFinder for MapClient {
    async fn maplink(&self, query: &str, current: Option<&LocationHint>) -> Result<String, MapError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&MaplinkRequest { query, current })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MapError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MaplinkResponse =
            serde_json::from_str(&body).map_err(|err| MapError::InvalidLink(err.to_string()))?;
        tracing::debug!(source = ?parsed.source, "maplink resolved");
        validate_link(parsed.url)
    }
}

/// Accepts only links the navigation handler can open.
pub fn validate_link(url: String) -> Result<String, MapError> {
    if ChatResponse::is_navigation_link(&url) {
        Ok(url)
    } else {
        Err(MapError::InvalidLink(url))
    }
}
