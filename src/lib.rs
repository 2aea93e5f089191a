//! Switchyard: request routing, middleware composition and rule-string
//! validation for HTTP services.
//!
//! The core (`routing`, `middleware`, `validation`) is synchronous and
//! transport-agnostic; `http::server` adapts it to Axum.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod routing;
pub mod security;
pub mod validation;

pub use config::AppConfig;
pub use error::{HandlerError, PatternError, RoutingError, RuleError, UrlError};
pub use http::{HttpMethod, HttpServer, Reply, Request, Response};
pub use lifecycle::Shutdown;
pub use middleware::{from_fn, Middleware, MiddlewareRef, Next};
pub use routing::{Group, Handler, Router};
pub use validation::{validate, RuleSet, ValidationResult, Validator};
