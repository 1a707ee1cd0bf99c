//! Timeout helpers.

use std::future::Future;
use std::time::Duration;

use crate::error::AgentError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, AgentError>>,
) -> Result<T, AgentError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Timeout(duration.as_millis() as u64)),
    }
}

/// Best-effort lookup: wait at most `duration`, yield `fallback` on expiry or error.
pub async fn with_fallback<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, AgentError>>,
    fallback: T,
) -> T {
    match with_timeout(duration, future).await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Enrichment lookup fell back");
            fallback
        }
    }
}
