//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → stdout (fmt layer), filtered by RUST_LOG or config
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the HTTP layer into dispatch spans
//! - Worker ID is attached to every worker lifecycle event

pub mod logging;

pub use logging::init_logging;
