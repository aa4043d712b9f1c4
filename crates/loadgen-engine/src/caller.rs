//! The trait a load-generator target implements to be driven by the engine.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::{CallResult, RawRequest, RawResponse};

/// Carries a call failure's message across the `call` / `check` boundary.
///
/// Kept distinct from [`crate::config::ConfigError`]: this one describes a
/// single failed call, not a malformed generator configuration.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ErrorInfo {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl ErrorInfo {
    /// Builds an [`ErrorInfo`] from anything convertible to a `String`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A target the engine can drive. One instance is shared (via `Arc`) across
/// every concurrently in-flight call.
///
/// Implementations must be side-effect-safe to call concurrently: the engine
/// never serializes calls to `build_request`, `call`, or `check` against one
/// another.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Builds the next request to send. Called once per call, just before
    /// dispatch; implementations typically assign the request id here.
    fn build_request(&self) -> RawRequest;

    /// Sends `payload` to the target and returns its raw response payload,
    /// or an [`ErrorInfo`] describing why the call itself failed (connection
    /// refused, write error, malformed reply). `timeout` is informational —
    /// the engine enforces the deadline independently and will discard a late
    /// response; implementations may still use it to bound their own I/O.
    async fn call(&self, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, ErrorInfo>;

    /// Classifies a completed call into a [`CallResult`]. Called only when
    /// `call` returned `Ok`; the engine fills in `elapsed` after this
    /// returns, so implementations may leave it zeroed.
    fn check(&self, request: &RawRequest, response: &RawResponse) -> CallResult;
}
