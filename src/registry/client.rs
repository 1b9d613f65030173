//! HTTP client shared by the package providers
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry logic (max 3 retries)
//! - Rate limit and not-found mapping to [`RegistryError`]
//! - JSON, text and raw byte helpers with an optional `Accept` header

use crate::error::RegistryError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("spackify/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error(
                    "",
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Perform a GET request with retry logic and error context
    pub async fn get_with_context(
        &self,
        url: &str,
        accept: Option<&str>,
        package: &str,
        registry: &str,
    ) -> Result<Response, RegistryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            let mut request = self.client.get(url);
            if let Some(accept) = accept {
                request = request.header(ACCEPT, accept);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(RegistryError::rate_limit_exceeded(registry));
                    } else if status == StatusCode::NOT_FOUND {
                        return Err(RegistryError::package_not_found(package, registry));
                    } else if !status.is_success() {
                        return Err(RegistryError::network_error(
                            package,
                            registry,
                            format!("HTTP {}", status),
                        ));
                    } else {
                        return Ok(response);
                    }
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(RegistryError::timeout(package, registry));
                }
                Err(e) => {
                    last_error = Some(RegistryError::network_error(
                        package,
                        registry,
                        e.to_string(),
                    ));
                }
            }

            if attempt < self.max_retries {
                debug!(url, attempt, delay_ms = delay, "retrying request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }
        }

        Err(last_error
            .unwrap_or_else(|| RegistryError::network_error(package, registry, "unknown error")))
    }

    /// Perform a GET request and parse the JSON response
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        accept: Option<&str>,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let response = self.get_with_context(url, accept, package, registry).await?;
        response.json::<T>().await.map_err(|e| RegistryError::InvalidResponse {
            package: package.to_string(),
            registry: registry.to_string(),
            message: format!("failed to parse JSON: {}", e),
        })
    }

    /// Perform a GET request and get the text response
    pub async fn get_text(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<String, RegistryError> {
        let response = self.get_with_context(url, None, package, registry).await?;
        response.text().await.map_err(|e| RegistryError::InvalidResponse {
            package: package.to_string(),
            registry: registry.to_string(),
            message: format!("failed to get text response: {}", e),
        })
    }

    /// Perform a GET request and get the raw body (archives)
    pub async fn get_bytes(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<Vec<u8>, RegistryError> {
        let response = self.get_with_context(url, None, package, registry).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| RegistryError::InvalidResponse {
                package: package.to_string(),
                registry: registry.to_string(),
                message: format!("failed to read response body: {}", e),
            })
    }
}
