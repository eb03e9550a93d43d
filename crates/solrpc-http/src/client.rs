//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! Features:
//! - Retry with exponential backoff for transient errors
//! - Request numbering through the shared [`RequestCodec`]
//! - Batch request support (one HTTP call, JSON array body)

use async_trait::async_trait;
use std::time::Duration;

use solrpc_core::codec::RequestCodec;
use solrpc_core::config::{ClientConfig, Commitment};
use solrpc_core::error::TransportError;
use solrpc_core::policy::{RetryConfig, RetryPolicy};
use solrpc_core::request::{JsonRpcRequest, JsonRpcResponse};
use solrpc_core::transport::RpcTransport;

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpClientConfig {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// HTTP JSON-RPC client.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    codec: RequestCodec,
    retry: RetryPolicy,
    request_timeout: Duration,
    commitment: Option<Commitment>,
}

impl HttpRpcClient {
    /// Create a client from an explicit endpoint configuration.
    pub fn new(client: &ClientConfig, config: HttpClientConfig) -> Result<Self, TransportError> {
        client.validate()?;
        let url = client.endpoint.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(TransportError::Config(format!(
                "HTTP endpoint must start with http:// or https://, got '{url}'"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.to_string(),
            http,
            codec: RequestCodec::new(client.json_rpc_version.clone()),
            retry: RetryPolicy::new(config.retry),
            request_timeout: config.request_timeout,
            commitment: client.commitment,
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(&ClientConfig::new(url)?, HttpClientConfig::default())
    }

    /// Commitment used by typed methods when the caller passes none.
    pub fn commitment(&self) -> Option<Commitment> {
        self.commitment
    }

    async fn post<B, T>(&self, body: &B) -> Result<T, TransportError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        ms: self.request_timeout.as_millis() as u64,
                    }
                } else {
                    TransportError::Http(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.post::<_, JsonRpcResponse>(&req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            url = %self.url,
                            method = %req.method,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            attempt,
                            error = %e,
                            url = %self.url,
                            method = %req.method,
                            "max retries exceeded"
                        );
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// One HTTP call carrying all requests as a JSON array.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        if reqs.is_empty() {
            return Ok(vec![]);
        }
        tracing::debug!(size = reqs.len(), url = %self.url, "sending batch");
        self.post::<_, Vec<JsonRpcResponse>>(&reqs).await
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn codec(&self) -> &RequestCodec {
        &self.codec
    }
}

impl std::fmt::Debug for HttpRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpcClient")
            .field("url", &self.url)
            .field("commitment", &self.commitment)
            .finish()
    }
}
