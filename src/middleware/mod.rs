//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch (route matched)
//!     → pipeline.rs (instantiate refs, compose m1(m2(...mN(handler))))
//!     → m1 before → m2 before → ... → handler
//!     → ... → m2 after → m1 after
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Synchronous onion model: `handle(request, next)` owns the request and returns a response
//! - A middleware short-circuits by returning without calling `next.run`
//! - Request mutations before `next.run` are visible to everything downstream
//! - Per-request middleware instances are built fresh for every dispatch

pub mod pipeline;

use std::sync::Arc;

use crate::http::{Request, Response};

pub use pipeline::{Next, Pipeline};

/// Request/response interceptor.
pub trait Middleware: Send + Sync {
    fn handle(&self, request: Request, next: Next<'_>) -> Response;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware built from a closure.
pub struct FromFn<F>(F);

/// Wrap a closure `|request, next| -> Response` as middleware.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next<'_>) -> Response + Send + Sync + 'static,
{
    FromFn(f)
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(Request, Next<'_>) -> Response + Send + Sync,
{
    fn handle(&self, request: Request, next: Next<'_>) -> Response {
        (self.0)(request, next)
    }

    fn name(&self) -> &'static str {
        "from_fn"
    }
}

type Factory = dyn Fn() -> Arc<dyn Middleware> + Send + Sync;

/// How a route refers to a middleware.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// One instance shared by every request.
    Shared(Arc<dyn Middleware>),
    /// A fresh instance per dispatched request.
    PerRequest(Arc<Factory>),
}

impl MiddlewareRef {
    pub fn shared(middleware: impl Middleware + 'static) -> Self {
        MiddlewareRef::Shared(Arc::new(middleware))
    }

    pub fn per_request<M, F>(factory: F) -> Self
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        MiddlewareRef::PerRequest(Arc::new(move || Arc::new(factory()) as Arc<dyn Middleware>))
    }

    pub(crate) fn instantiate(&self) -> Arc<dyn Middleware> {
        match self {
            MiddlewareRef::Shared(middleware) => Arc::clone(middleware),
            MiddlewareRef::PerRequest(factory) => factory(),
        }
    }
}

impl std::fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareRef::Shared(m) => f.debug_tuple("Shared").field(&m.name()).finish(),
            MiddlewareRef::PerRequest(_) => f.write_str("PerRequest"),
        }
    }
}
