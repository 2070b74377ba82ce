//! Retry policy for bridged calls.
//!
//! # Responsibilities
//! - Decide whether a failed exchange may be repeated on another worker
//! - Bound attempts by configuration and by the size of the pool
//! - Space attempts with exponential backoff + jitter
//!
//! # Design Decisions
//! - A failed write never reached the worker, so it is always retryable
//! - A lost or late reply may have been processed; only idempotent methods retry it
//! - Empty pool and encoding failures are never retried

use std::time::Duration;

use crate::bridge::DispatchError;
use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Methods that are safe to repeat.
pub fn is_idempotent(method: &str) -> bool {
    matches!(
        method.to_ascii_uppercase().as_str(),
        "GET" | "HEAD" | "OPTIONS" | "PUT" | "DELETE" | "TRACE"
    )
}

/// Whether `error` on a call with `method` may be retried on another worker.
pub fn is_retryable(method: &str, error: &DispatchError) -> bool {
    match error {
        DispatchError::ForwardFailed { .. } => true,
        DispatchError::ReplyFailed { .. } | DispatchError::Timeout { .. } => is_idempotent(method),
        DispatchError::NoWorkerAvailable | DispatchError::SerializationFailed(_) => false,
    }
}

/// Attempt bound and backoff shape for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// A policy that always makes exactly one attempt.
    pub fn disabled() -> Self {
        Self::from_config(&RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        })
    }

    /// Total attempts allowed for a call that starts with `pool_size` workers.
    pub fn attempts_for(&self, pool_size: usize) -> u32 {
        if !self.enabled {
            return 1;
        }
        let pool_bound = u32::try_from(pool_size).unwrap_or(u32::MAX);
        self.max_attempts.min(pool_bound).max(1)
    }

    /// Delay before the attempt following failed attempt number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerId;

    #[test]
    fn retryable_table() {
        let worker = WorkerId::new();
        let forward = DispatchError::ForwardFailed { worker, reason: "reset".into() };
        let reply = DispatchError::ReplyFailed { worker, reason: "closed".into() };
        let timeout = DispatchError::Timeout { worker, after: Duration::from_secs(1) };

        assert!(is_retryable("POST", &forward));
        assert!(is_retryable("GET", &forward));

        assert!(is_retryable("GET", &reply));
        assert!(is_retryable("delete", &timeout));
        assert!(!is_retryable("POST", &reply));
        assert!(!is_retryable("PATCH", &timeout));

        assert!(!is_retryable("GET", &DispatchError::NoWorkerAvailable));
    }

    #[test]
    fn attempts_bounded_by_pool() {
        let policy = RetryPolicy {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };

        assert_eq!(policy.attempts_for(0), 1);
        assert_eq!(policy.attempts_for(1), 1);
        assert_eq!(policy.attempts_for(2), 2);
        assert_eq!(policy.attempts_for(10), 3);

        assert_eq!(RetryPolicy::disabled().attempts_for(10), 1);
    }
}
