//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway handler and breaker registry produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the listener to the upstream and back
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
