//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Bridged call:
//!     → timeouts.rs (deadline on send + reply)
//!     → On failure: retries.rs (retryable? attempts left?)
//!     → backoff.rs (delay before next worker)
//! ```
//!
//! # Design Decisions
//! - Every worker exchange has a deadline unless configured otherwise
//! - Retries go to a different worker; the failed one is already evicted
//! - Retries are off by default and bounded by pool size when on

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use retries::{is_idempotent, is_retryable, RetryPolicy};
pub use timeouts::with_deadline;
