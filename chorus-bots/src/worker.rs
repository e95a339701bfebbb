//! Generation worker endpoint client.
//!
//! Each worker serves plain text over loopback HTTP. The prompt travels as
//! a `prompt` request header (possibly empty); the reply body may carry the
//! literal `<|startoftext|>` sentinel, which is stripped before use.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderValue;
use thiserror::Error;

/// Sentinel the workers prefix onto generated text.
pub const START_SENTINEL: &str = "<|startoftext|>";

/// Recoverable failure while querying a worker. The scheduler skips the
/// affected turn; nothing here may take down the loop.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request to worker failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("worker answered HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("prompt is not a valid header value")]
    InvalidPrompt,

    #[error("unknown speaker: {0}")]
    UnknownSpeaker(String),
}

/// HTTP client for worker endpoints.
#[derive(Clone)]
pub struct EndpointClient {
    http: reqwest::Client,
}

impl EndpointClient {
    /// Build a client with a per-request timeout. Generation is slow, so
    /// the timeout should be generous.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("can't build worker HTTP client")?;
        Ok(Self { http })
    }

    /// Ask the worker on `port` for a generation steered by `prompt`.
    /// Returns the reply with the sentinel stripped.
    pub async fn generate(&self, port: u16, prompt: &str) -> Result<String, QueryError> {
        let value =
            HeaderValue::from_bytes(prompt.as_bytes()).map_err(|_| QueryError::InvalidPrompt)?;
        let response = self
            .http
            .get(format!("http://localhost:{port}"))
            .header("prompt", value)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status));
        }

        let body = response.text().await?;
        Ok(body.replace(START_SENTINEL, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn passes_prompt_header_and_strips_sentinel() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/").header("prompt", "the storm");
                then.status(200).body("<|startoftext|>the storm raged on");
            })
            .await;

        let client = EndpointClient::new(Duration::from_secs(5)).unwrap();
        let out = client.generate(server.port(), "the storm").await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, "the storm raged on");
    }

    #[tokio::test]
    async fn empty_prompt_is_a_valid_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("an unprompted thought");
            })
            .await;

        let client = EndpointClient::new(Duration::from_secs(5)).unwrap();
        let out = client.generate(server.port(), "").await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, "an unprompted thought");
    }

    #[tokio::test]
    async fn error_status_surfaces_as_query_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(500).body("model blew up");
            })
            .await;

        let client = EndpointClient::new(Duration::from_secs(5)).unwrap();
        let err = client.generate(server.port(), "hello").await.unwrap_err();

        assert!(matches!(err, QueryError::Status(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn unreachable_port_is_a_transport_error() {
        let client = EndpointClient::new(Duration::from_secs(1)).unwrap();
        // nothing listens here
        let err = client.generate(1, "hello").await.unwrap_err();
        assert!(matches!(err, QueryError::Http(_)));
    }
}
