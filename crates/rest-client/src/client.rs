//! Generic REST client wrapper around reqwest.

use crate::error::RestError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use reqwest::Method;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Generic REST client for making HTTP requests.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Create a new REST client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::RequestBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new REST client with default timeout.
    pub fn with_default_timeout(base_url: &str) -> Result<Self, RestError> {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and decode the JSON body.
    ///
    /// * `query` - Optional query string (without leading '?')
    /// * `headers` - Optional additional headers
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: Option<&[(&str, &str)]>,
    ) -> Result<T, RestError> {
        let response = self.send(method, path, query, headers).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(body = %body, error = %e, "Failed to parse response");
            RestError::Parse(e.to_string())
        })
    }

    /// Issue a request whose successful response body is irrelevant.
    pub async fn request_empty(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: Option<&[(&str, &str)]>,
    ) -> Result<(), RestError> {
        self.send(method, path, query, headers).await.map(|_| ())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: Option<&[(&str, &str)]>,
    ) -> Result<Response, RestError> {
        let url = self.build_url(path, query);
        tracing::debug!(method = %method, path = %path, "HTTP request");

        let mut request = self.client.request(method, &url);

        if let Some(hdrs) = headers {
            for (key, value) in hdrs {
                request = request.header(*key, *value);
            }
        }

        let response = request.send().await?;
        Self::check_status(response).await
    }

    /// Build a full URL from path and optional query string.
    fn build_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// Turn non-success statuses into errors, keeping the body for diagnosis.
    async fn check_status(response: Response) -> Result<Response, RestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            return Err(RestError::RateLimited {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(RestError::HttpError {
            status: status.as_u16(),
            body,
        })
    }
}
