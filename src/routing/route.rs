//! Route definition and handler variants.

use std::fmt;
use std::sync::Arc;

use crate::error::{HandlerError, PatternError};
use crate::http::{HttpMethod, Reply, Request};
use crate::middleware::{Middleware, MiddlewareRef};
use crate::routing::pattern::UriPattern;

pub type HandlerResult = Result<Reply, HandlerError>;

/// Type-erased callable handler.
pub type HandlerFn = dyn Fn(&Request) -> HandlerResult + Send + Sync;

/// What runs at the center of a route's pipeline.
#[derive(Clone)]
pub enum Handler {
    Callable(Arc<HandlerFn>),
    /// Resolved at dispatch time through the router's controller registry.
    Controller { controller: String, action: String },
}

impl Handler {
    pub fn callable<F, R>(f: F) -> Self
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Handler::Callable(Arc::new(move |request| f(request).map(Into::into)))
    }

    pub fn controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Handler::Controller {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Callable(_) => f.write_str("Callable"),
            Handler::Controller { controller, action } => write!(f, "{controller}@{action}"),
        }
    }
}

/// A method + pattern bound to a handler.
///
/// Built with the `with_*` methods, then handed to a `RouteTable`, after
/// which only the owning router can extend it during registration.
#[derive(Debug, Clone)]
pub struct Route {
    method: HttpMethod,
    pattern: UriPattern,
    handler: Handler,
    middleware: Vec<MiddlewareRef>,
    name: Option<String>,
}

impl Route {
    pub fn new(method: HttpMethod, template: &str, handler: Handler) -> Result<Self, PatternError> {
        Ok(Self {
            method,
            pattern: UriPattern::compile(template)?,
            handler,
            middleware: Vec::new(),
            name: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(MiddlewareRef::shared(middleware));
        self
    }

    pub fn with_middleware_ref(mut self, middleware: MiddlewareRef) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn pattern(&self) -> &UriPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Middleware in execution order (outermost first).
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn push_middleware(&mut self, middleware: MiddlewareRef) {
        self.middleware.push(middleware);
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let route = Route::new(
            HttpMethod::Get,
            "/users/{id:int}/",
            Handler::callable(|_| Ok(json!({"ok": true}))),
        )
        .unwrap()
        .with_name("users.show")
        .with_middleware(from_fn(|req, next| next.run(req)));

        assert_eq!(route.method(), HttpMethod::Get);
        assert_eq!(route.pattern().template(), "/users/{id:int}");
        assert_eq!(route.name(), Some("users.show"));
        assert_eq!(route.middleware().len(), 1);
        assert!(matches!(route.handler(), Handler::Callable(_)));
    }

    #[test]
    fn test_invalid_template() {
        let err = Route::new(HttpMethod::Get, "/{id:bogus}", Handler::controller("a", "b")).unwrap_err();
        assert!(matches!(err, PatternError::InvalidPatternType { .. }));
    }

    #[test]
    fn test_callable_normalizes_reply() {
        let handler = Handler::callable(|req| Ok(format!("hi {}", req.path())));
        let Handler::Callable(f) = handler else {
            panic!("expected callable");
        };
        let reply = f(&Request::new(HttpMethod::Get, "/x")).unwrap();
        assert_eq!(reply.into_response().body(), "hi /x");
        assert_eq!(
            format!("{:?}", Handler::controller("users", "index")),
            "users@index"
        );
    }
}
