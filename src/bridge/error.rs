//! Dispatch error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::pool::WorkerId;

/// Why a bridged call failed.
///
/// Every variant is local to one call; none of them affect other workers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No worker was registered, or none became free in time.
    #[error("no worker connection available")]
    NoWorkerAvailable,

    /// The envelope could not be encoded. No worker was touched.
    #[error("failed to serialize request envelope: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Writing the envelope failed. The worker has been evicted.
    #[error("failed to forward request to {worker}: {reason}")]
    ForwardFailed { worker: WorkerId, reason: String },

    /// The connection failed or closed before a reply. The worker has been evicted.
    #[error("failed to read reply from {worker}: {reason}")]
    ReplyFailed { worker: WorkerId, reason: String },

    /// The worker did not reply before the deadline. It has been evicted and closed.
    #[error("{worker} did not reply within {after:?}")]
    Timeout { worker: WorkerId, after: Duration },
}

impl DispatchError {
    /// The worker involved, if the call got that far.
    pub fn worker(&self) -> Option<WorkerId> {
        match self {
            DispatchError::ForwardFailed { worker, .. }
            | DispatchError::ReplyFailed { worker, .. }
            | DispatchError::Timeout { worker, .. } => Some(*worker),
            DispatchError::NoWorkerAvailable | DispatchError::SerializationFailed(_) => None,
        }
    }
}
