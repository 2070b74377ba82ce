//! Worker pool subsystem.
//!
//! # Data Flow
//! ```text
//! Worker upgrade completes
//!     → worker.rs (handle + link for the socket owner)
//!     → registry.rs (register, eligible for leasing)
//!
//! Bridged call arrives
//!     → registry.rs (lease next free worker in rotation)
//!     → worker.rs (send frame, wait on reply slot)
//!     → lease dropped, worker back in rotation
//! ```
//!
//! # Design Decisions
//! - One call per worker at a time; leases are exclusive
//! - Rotation is round-robin over free workers
//! - Failing workers are evicted and closed, never retried in place

pub mod registry;
pub mod worker;

pub use registry::{Acquire, Registry, WorkerLease, WorkerRegistration};
pub use worker::{OutboundFrame, WorkerConnection, WorkerId, WorkerIoError, WorkerLink};
