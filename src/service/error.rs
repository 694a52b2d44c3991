//! HTTP error classification and retry for the ticket service.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, TaskboardError};
use crate::types::TicketId;

/// A non-success response from the ticket service.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    pub status: reqwest::StatusCode,
    /// Retry-After header value in seconds, if present
    pub retry_after: Option<u64>,
    /// `detail` from the error body, or the canonical reason
    pub message: String,
}

impl ApiError {
    pub fn new(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Map to the crate error. `ticket` names the ticket a 404 refers to;
    /// without one a 404 is an ordinary API failure.
    pub fn into_error(self, ticket: Option<TicketId>) -> TaskboardError {
        match self.status.as_u16() {
            401 => TaskboardError::NotAuthenticated,
            403 => TaskboardError::Forbidden(self.message),
            404 => match ticket {
                Some(id) => TaskboardError::TicketNotFound(id),
                None => TaskboardError::Api {
                    status: Some(404),
                    message: self.message,
                },
            },
            429 => TaskboardError::RateLimited(self.retry_after.unwrap_or(60)),
            status => TaskboardError::Api {
                status: Some(status),
                message: format!("HTTP {status}: {}", self.message),
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

/// Retry settings for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
///
/// Non-transient errors (authorization, not found, validation, rate limiting)
/// are returned immediately.
pub async fn execute_with_retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, error = %e, "retrying transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
