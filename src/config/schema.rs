//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Worker session behavior.
    pub worker: WorkerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Worker session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Echo frames that arrive while no call is waiting on the worker.
    pub echo_idle_frames: bool,

    /// Frames that may be queued for one worker socket.
    pub outbound_buffer: usize,

    /// Interval between heartbeat pings in seconds (0 = disabled).
    pub ping_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            echo_idle_frames: true,
            outbound_buffer: 16,
            ping_interval_secs: 0,
        }
    }
}

/// Timeout configuration for bridged calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a call waits for a free worker when all are leased, in milliseconds.
    pub acquire_ms: u64,

    /// Send + reply deadline per worker exchange in seconds (0 = wait forever).
    pub reply_secs: u64,

    /// Outer bound on a whole HTTP request in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_ms)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        (self.reply_secs > 0).then(|| Duration::from_secs(self.reply_secs))
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            acquire_ms: 5_000,
            reply_secs: 30,
            request_secs: 120,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries against the next worker.
    pub enabled: bool,

    /// Maximum number of attempts per call, first attempt included.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 50,
            max_delay_ms: 1_000,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
