//! Shared HTTP client with a simple fixed-delay retry policy.
//!
//! Retried: connection failures, timeouts, HTTP 408, 429 and 5xx.
//! Everything else is returned to the caller on the first attempt.

use crate::domain::model::RequestSettings;
use crate::utils::error::{FetchError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = concat!("tess-fetch/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpPayload {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &RequestSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            retry_attempts: settings.retry_attempts,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        })
    }

    /// GET returning whatever final status the server gave.
    pub async fn get(&self, url: &str) -> Result<HttpPayload> {
        self.send_with_retry(url, || self.client.get(url)).await
    }

    /// GET that fails with [`FetchError::HttpStatus`] unless the final status is 2xx.
    pub async fn get_ok(&self, url: &str) -> Result<Vec<u8>> {
        let payload = self.get(url).await?;
        ensure_success(url, payload)
    }

    pub async fn get_ok_with_query(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>> {
        let payload = self
            .send_with_retry(url, || self.client.get(url).query(query))
            .await?;
        ensure_success(url, payload)
    }

    pub async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<Vec<u8>> {
        let payload = self
            .send_with_retry(url, || self.client.post(url).form(form))
            .await?;
        ensure_success(url, payload)
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<HttpPayload>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let outcome = match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    match response.bytes().await {
                        Ok(body) => Ok(HttpPayload {
                            status,
                            body: body.to_vec(),
                        }),
                        Err(e) => Err(FetchError::from(e)),
                    }
                }
                Err(e) => Err(FetchError::from(e)),
            };

            let retryable = match &outcome {
                Ok(payload) => is_retryable_status(payload.status),
                Err(e) => e.is_transient(),
            };

            if !retryable || attempt >= self.retry_attempts {
                return outcome;
            }

            attempt += 1;
            match &outcome {
                Ok(payload) => tracing::warn!(
                    "{} returned HTTP {}, retrying ({}/{})",
                    url,
                    payload.status.as_u16(),
                    attempt,
                    self.retry_attempts
                ),
                Err(e) => tracing::warn!(
                    "Request to {} failed: {}, retrying ({}/{})",
                    url,
                    e,
                    attempt,
                    self.retry_attempts
                ),
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429) || status.is_server_error()
}

fn ensure_success(url: &str, payload: HttpPayload) -> Result<Vec<u8>> {
    if payload.status.is_success() {
        Ok(payload.body)
    } else {
        Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: payload.status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher(retry_attempts: u32) -> HttpFetcher {
        HttpFetcher::new(&RequestSettings {
            timeout_seconds: 5,
            retry_attempts,
            retry_delay_ms: 0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_ok_returns_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/targets.csv");
                then.status(200).body("TICID,Camera,CCD\n1,1,1\n");
            })
            .await;

        let body = fetcher(2).get_ok(&server.url("/targets.csv")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, b"TICID,Camera,CCD\n1,1,1\n");
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let err = fetcher(3).get_ok(&server.url("/missing")).await.unwrap_err();

        mock.assert_hits_async(1).await;
        assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_exhausted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/busy");
                then.status(503);
            })
            .await;

        let payload = fetcher(2).get(&server.url("/busy")).await.unwrap();

        mock.assert_hits_async(3).await;
        assert_eq!(payload.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_post_form_sends_fields() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/invoke")
                    .x_www_form_urlencoded_tuple("request", "{\"a\":1}");
                then.status(200).body("ok");
            })
            .await;

        let body = fetcher(0)
            .post_form(&server.url("/invoke"), &[("request", "{\"a\":1}".to_string())])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, b"ok");
    }
}
