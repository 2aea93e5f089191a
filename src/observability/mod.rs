//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router::dispatch
//!     → debug span per dispatch (method, path)
//!     → request_log.rs (access line per matched request)
//!     → metrics.rs (request counter + latency histogram)
//!
//! Validator / RateLimiter
//!     → metrics.rs (failure and rejection counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON, see logging.rs)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated messages
//! - Request ID flows in via the `x-request-id` header
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use request_log::RequestLogger;
