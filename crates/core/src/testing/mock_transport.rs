//! Mock transport for testing.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::xmlrpc::{Transport, TransportError, Value};

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Mock implementation of the [`Transport`] trait.
///
/// Provides controllable behavior for testing:
/// - Script per-method response queues
/// - Track invocations for assertions
/// - Inject a one-shot transport error
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Scripted responses, popped per method in FIFO order.
    responses: RwLock<HashMap<String, VecDeque<Value>>>,
    /// Recorded invocations.
    calls: RwLock<Vec<RecordedCall>>,
    /// If set, the next invocation fails with this error.
    next_error: RwLock<Option<TransportError>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the given method.
    pub async fn enqueue(&self, method: &str, response: Value) {
        self.responses
            .write()
            .await
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Configure the next invocation to fail with the given error.
    pub async fn set_next_error(&self, error: TransportError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get recorded invocations.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of invocations performed.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn invoke(&self, method: &str, params: &[Value]) -> Result<Value, TransportError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.calls.write().await.push(RecordedCall {
            method: method.to_string(),
            params: params.to_vec(),
        });

        self.responses
            .write()
            .await
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                TransportError::Malformed(format!("no scripted response for {method}"))
            })
    }
}
