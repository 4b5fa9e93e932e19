//! Deadline racing for async operations.
//!
//! [`with_timeout`] races a future against a timer. When the timer wins the
//! future is dropped, which for reqwest aborts the request and releases the
//! connection instead of leaving it running in the background.

use std::future::Future;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Run `operation` with a hard deadline.
///
/// Returns `ClientError::Timeout` carrying `label` if `after` elapses first.
/// Errors produced by the operation itself pass through unchanged.
pub async fn with_timeout<T, F>(operation: F, after: Duration, label: &str) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    if after.is_zero() {
        return Err(ClientError::InvalidRequest(format!(
            "timeout for {} must be > 0",
            label
        )));
    }

    match tokio::time::timeout(after, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(label, after_ms = after.as_millis() as u64, "deadline elapsed");
            Err(ClientError::Timeout {
                label: label.to_string(),
                after,
            })
        }
    }
}
