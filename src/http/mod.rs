//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body cap)
//!     → request.rs (capture method, path, query, body fields, headers)
//!     → routing::Router::dispatch
//!     → response.rs (status, headers, body; converted back to Axum)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - The routing core never sees Axum types except `HeaderMap` and `StatusCode`
//! - Methods outside the supported set are rejected before dispatch

pub mod method;
pub mod request;
pub mod response;
pub mod server;

pub use method::HttpMethod;
pub use request::{CaptureError, Request};
pub use response::{Reply, Response};
pub use server::{build_app, HttpServer};
