//! Timeout enforcement for upstream calls.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other transport errors
//! - The deadline bounds the wait for response headers; the body streams after

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why an upstream call produced no response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No response within the configured deadline.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// Connect failure, reset, or protocol error.
    #[error("upstream transport error: {0}")]
    Transport(#[source] hyper_util::client::legacy::Error),
}

impl UpstreamError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Transport(_) => "transport",
        }
    }
}

/// Await an upstream call, failing with [`UpstreamError::Timeout`] after `limit`.
pub async fn call_with_deadline<F, T>(limit: Duration, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, hyper_util::client::legacy::Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(UpstreamError::Transport(e)),
        Err(_) => Err(UpstreamError::Timeout(limit)),
    }
}
