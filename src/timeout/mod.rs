//! Per-attempt deadline enforcement.
//!
//! One attempt races against a timer; if the timer wins, the attempt resolves
//! to [`ApiError::Timeout`] and its future is dropped. Dropping is the
//! cancellation hook for the transport — an exchange that cannot be aborted
//! simply has its eventual result discarded. The retry engine wraps this, so
//! every retry gets a fresh deadline window.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::ApiError;

/// Resolves `attempt` within `limit`, or fails with [`ApiError::Timeout`].
pub async fn with_deadline<T, F>(attempt: F, limit: Duration) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match timeout(limit, attempt).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => Err(ApiError::Timeout { limit }),
    }
}
