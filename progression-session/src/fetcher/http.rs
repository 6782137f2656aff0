//! HTTP fetcher for the Lexquest gamification API.
//!
//! Reads `GET {base_url}/users/{user_id}/progression`, which answers with a
//! [`ProgressSnapshot`] JSON body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use super::traits::*;
use crate::config::FetcherConfig;

/// HTTP-backed fetcher.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpFetcher {
    /// Create a new fetcher against `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// Create from session configuration.
    pub fn from_config(config: &FetcherConfig) -> Result<Self, FetchError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| FetchError::Unavailable("No base_url configured".to_string()))?;

        Self::new(
            base_url,
            config.auth_token.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Build the request URL.
    fn progression_url(&self, user_id: &str) -> String {
        format!("{}/users/{}/progression", self.base_url, user_id)
    }

    /// Build authorization header if a token is set.
    fn auth_header(&self) -> Option<String> {
        self.auth_token.as_ref().map(|t| format!("Bearer {}", t))
    }
}

#[async_trait]
impl ProgressionFetcher for HttpFetcher {
    fn id(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, user_id: &str) -> Result<ProgressSnapshot, FetchError> {
        let url = self.progression_url(user_id);
        debug!(url = %url, "Fetching progression");

        let mut request = self.client.get(&url);
        if let Some(auth) = self.auth_header() {
            request = request.header(header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(user_id.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ProgressSnapshot>()
            .await
            .map_err(|e| FetchError::InvalidPayload(e.to_string()))
    }
}
