//! XML-RPC transport layer.
//!
//! The session client consumes a single capability: invoke a named remote
//! procedure with positional parameters and get a structured value back.
//! [`Transport`] is that seam; [`HttpTransport`] is the production
//! implementation and `testing::MockTransport` the scripted one. The wire
//! codec lives in [`wire`] so it can be exercised without a network.

mod http;
mod value;
pub mod wire;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpTransport;
pub use value::Value;

/// Errors below the application protocol: the call never produced a
/// well-formed, non-fault response. Application-level status failures are
/// a separate concern ([`crate::client::ClientError::Status`]).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to initialize transport: {0}")]
    Init(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed XML-RPC response: {0}")]
    Malformed(String),

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

/// An RPC transport: one blocking round trip per invocation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke `method` with positional `params` and return the response
    /// payload value.
    async fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, TransportError>;
}
