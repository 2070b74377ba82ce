//! Request/response bridging subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request (method, path, headers, body)
//!     → envelope.rs (RequestEnvelope → JSON text frame)
//!     → dispatcher.rs (lease worker, send, await one reply)
//!     → reply bytes or error.rs (DispatchError)
//! ```
//!
//! # Design Decisions
//! - The reply is passed through verbatim; no schema is imposed on it
//! - No correlation id on the wire; exclusivity comes from the lease
//! - Serialization happens before a worker is leased

pub mod dispatcher;
pub mod envelope;
pub mod error;

pub use dispatcher::{DispatchSettings, Dispatcher};
pub use envelope::{HeaderMultimap, RequestEnvelope};
pub use error::DispatchError;
