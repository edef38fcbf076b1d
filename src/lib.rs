//! Circuit-breaking reverse-proxy gateway.
//!
//! Forwards requests under a mount prefix to a single upstream API and keeps
//! a circuit breaker per endpoint (`METHOD:PATH`). An endpoint that keeps
//! failing is short-circuited with 503 until its cooldown passes.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use resilience::CircuitBreakerRegistry;
