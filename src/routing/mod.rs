//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     Router::get / post / ... / group
//!     → pattern.rs (compile template into typed segments)
//!     → route.rs (method + pattern + handler + middleware + name)
//!     → table.rs (append in registration order)
//!
//! Dispatch (per request):
//!     Request (method, path)
//!     → table.rs (first match, or 404 / 405 with allowed methods)
//!     → router.rs (global layers + route middleware → handler)
//!     → controller.rs (for controller@action handlers)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Routes are compiled at registration, immutable once the router is shared
//! - Deterministic: first registered match wins
//! - Placeholder types constrain matching; captured values stay strings

pub mod controller;
pub mod pattern;
pub mod route;
pub mod router;
pub mod table;

pub use controller::{ActionController, Controller, ControllerRegistry};
pub use pattern::{normalize_path, ParamType, RouteParam, RouteParams, UriPattern};
pub use route::{Handler, HandlerFn, HandlerResult, Route};
pub use router::{Group, RouteHandle, Router};
pub use table::{RouteMatch, RouteTable};
