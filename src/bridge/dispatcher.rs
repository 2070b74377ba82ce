//! Bridge dispatcher: one HTTP call, one worker exchange.
//!
//! # Responsibilities
//! - Encode the envelope before any worker is touched
//! - Lease a worker, send the frame, wait for exactly one reply
//! - Evict workers whose write, read or deadline fails
//! - Optionally retry on the next worker per the retry policy

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;

use crate::bridge::envelope::RequestEnvelope;
use crate::bridge::error::DispatchError;
use crate::config::BridgeConfig;
use crate::pool::{Registry, WorkerLease};
use crate::resilience::{is_retryable, with_deadline, RetryPolicy};

/// Timing and retry knobs for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// How long to wait for a free worker when every worker is leased.
    pub acquire_timeout: Duration,
    /// Deadline for send + reply on one worker; `None` waits forever.
    pub reply_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl DispatchSettings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            acquire_timeout: config.timeouts.acquire_timeout(),
            reply_timeout: config.timeouts.reply_timeout(),
            retry: RetryPolicy::from_config(&config.retries),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

/// Forwards envelopes to leased workers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, settings: DispatchSettings) -> Self {
        Self { registry, settings }
    }

    /// Forward `envelope` to one worker and return its reply verbatim.
    pub async fn forward(&self, envelope: &RequestEnvelope) -> Result<Bytes, DispatchError> {
        let frame = envelope.to_frame()?;
        let max_attempts = self.settings.retry.attempts_for(self.registry.len());
        let mut attempt = 0;
        let mut last_error = None;

        loop {
            attempt += 1;

            // A retry that finds no free worker reports the failure that caused it.
            let Some(lease) = self.registry.acquire(self.settings.acquire_timeout).await else {
                return Err(last_error.unwrap_or(DispatchError::NoWorkerAvailable));
            };

            tracing::debug!(
                worker = %lease.id(),
                attempt = attempt,
                method = %envelope.method(),
                path = %envelope.path(),
                "Forwarding request to worker"
            );

            match self.exchange(&lease, frame.clone()).await {
                Ok(reply) => {
                    tracing::debug!(worker = %lease.id(), bytes = reply.len(), "Worker replied");
                    return Ok(reply);
                }
                Err(err) => {
                    drop(lease);
                    if attempt < max_attempts && is_retryable(envelope.method(), &err) {
                        let delay = self.settings.retry.backoff(attempt);
                        tracing::info!(attempt = attempt, delay = ?delay, error = %err, "Retrying on next worker");
                        last_error = Some(err);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One send + reply on a leased worker. Any failure evicts the worker.
    async fn exchange(&self, lease: &WorkerLease, frame: String) -> Result<Bytes, DispatchError> {
        let worker = lease.id();
        let reply = lease.expect_reply();

        let outcome = with_deadline(self.settings.reply_timeout, async {
            if let Err(e) = lease.send(frame).await {
                return Err(DispatchError::ForwardFailed {
                    worker,
                    reason: e.to_string(),
                });
            }

            reply.await.map_err(|_| DispatchError::ReplyFailed {
                worker,
                reason: "connection closed before reply".to_string(),
            })
        })
        .await;

        let err = match outcome {
            Ok(Ok(bytes)) => return Ok(bytes),
            Ok(Err(err)) => err,
            Err(_) => DispatchError::Timeout {
                worker,
                after: self.settings.reply_timeout.unwrap_or_default(),
            },
        };

        if lease.evict() {
            tracing::warn!(worker = %worker, error = %err, workers = self.registry.len(), "Evicted worker");
        }
        Err(err)
    }
}
