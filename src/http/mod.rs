//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Caller:
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, build envelope)
//!     → [bridge dispatcher leases a worker]
//!     → response.rs (reply body or mapped error)
//!
//! Worker:
//!     → websocket.rs (upgrade, register, session loop)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, BridgeServer};
