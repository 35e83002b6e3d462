//! HTTP transport for XML-RPC calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use super::{wire, Transport, TransportError, Value};

/// Blocking-per-call XML-RPC transport over HTTP POST.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Init(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The endpoint this transport posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, TransportError> {
        let body = wire::build_request(method, params);
        debug!(method = method, bytes = body.len(), "XML-RPC call");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        wire::parse_response(&text)
    }
}
