//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, mount prefix)
//!     → proxy.rs (endpoint key, breaker admission, upstream request)
//!     → upstream call under deadline
//!     → response.rs (relay or map failure to status)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{endpoint_key, Upstream};
pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayServer};
