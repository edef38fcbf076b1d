//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → circuit_breaker.rs (admit? per endpoint key)
//!     → timeouts.rs (enforce request deadline)
//!     → circuit_breaker.rs (report success / failure)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: a rejection or failure is surfaced to the caller once
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreakerRegistry, CircuitStatus, EndpointSnapshot, EndpointState};
pub use timeouts::{call_with_deadline, UpstreamError};
