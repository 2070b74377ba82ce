//! Deadline enforcement.
//!
//! # Responsibilities
//! - Wrap worker exchanges with an optional deadline
//! - Cancel the wrapped operation cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - `None` means wait forever; callers opt in to unbounded waits explicitly
//! - Expiry is reported as `Elapsed`, distinct from the operation's own errors

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Run `operation`, failing with `Elapsed` if `deadline` passes first.
pub async fn with_deadline<F>(deadline: Option<Duration>, operation: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, operation).await,
        None => Ok(operation.await),
    }
}
