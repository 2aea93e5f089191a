//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatched request (matched route):
//!     → rate_limit.rs (per-client fixed window)
//!     → route middleware → handler
//! ```
//!
//! # Design Decisions
//! - Limits are ordinary middleware, attached globally or per group
//! - Fail closed: an exhausted budget never reaches the handler

pub mod rate_limit;

pub use rate_limit::{client_key, InMemoryStore, RateLimitStore, RateLimiter, WindowHit};
