//! Route registration and dispatch.
//!
//! # Responsibilities
//! - Register routes (optionally inside prefix/middleware groups)
//! - Attach names and per-route middleware at registration time
//! - Resolve a request to a route, run its pipeline, normalize the result
//! - Reverse-route named routes into URLs
//!
//! # Design Decisions
//! - Registration needs `&mut Router`; once shared behind an `Arc` the table is frozen
//! - Resolution failures become responses here, so transports only ever see a `Response`
//! - Global layers wrap route middleware and only run for matched routes
//! - A panicking handler or middleware yields a 500, never a torn connection

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use axum::http::StatusCode;

use crate::error::{HandlerError, PatternError, UrlError};
use crate::http::{HttpMethod, Reply, Request, Response};
use crate::middleware::{Middleware, MiddlewareRef, Pipeline};
use crate::observability::metrics;
use crate::routing::controller::{Controller, ControllerRegistry};
use crate::routing::route::{Handler, Route};
use crate::routing::table::RouteTable;

/// Attributes applied to every route registered inside a group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: String,
    middleware: Vec<MiddlewareRef>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(MiddlewareRef::shared(middleware));
        self
    }

    pub fn middleware_ref(mut self, middleware: MiddlewareRef) -> Self {
        self.middleware.push(middleware);
        self
    }
}

/// Handle to a just-registered route.
pub struct RouteHandle<'r> {
    table: &'r mut RouteTable,
    index: usize,
}

impl RouteHandle<'_> {
    /// Name the route for `Router::resolve` and `Router::url_for`.
    ///
    /// Group prefixes are already part of the stored pattern. Reusing a name
    /// rebinds it to this route.
    pub fn name(self, name: impl Into<String>) -> Self {
        self.table.set_name(self.index, name.into());
        self
    }

    /// Append middleware inside any group middleware already attached.
    pub fn middleware(self, middleware: impl Middleware + 'static) -> Self {
        self.middleware_ref(MiddlewareRef::shared(middleware))
    }

    pub fn middleware_ref(self, middleware: MiddlewareRef) -> Self {
        self.table.route_mut(self.index).push_middleware(middleware);
        self
    }

    pub fn route(&self) -> &Route {
        self.table.route(self.index)
    }
}

#[derive(Default)]
pub struct Router {
    table: RouteTable,
    controllers: ControllerRegistry,
    layers: Vec<MiddlewareRef>,
    groups: Vec<Group>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route; the template is compiled now.
    pub fn try_route(
        &mut self,
        method: HttpMethod,
        template: &str,
        handler: Handler,
    ) -> Result<RouteHandle<'_>, PatternError> {
        let full = self.prefixed(template);
        let mut route = Route::new(method, &full, handler)?;
        for group in &self.groups {
            for middleware in &group.middleware {
                route.push_middleware(middleware.clone());
            }
        }

        tracing::debug!(%method, pattern = %route.pattern(), "Route registered");
        let index = self.table.push(route);
        Ok(RouteHandle {
            table: &mut self.table,
            index,
        })
    }

    /// Like `try_route`, but an invalid template is a startup bug and panics.
    pub fn route(&mut self, method: HttpMethod, template: &str, handler: Handler) -> RouteHandle<'_> {
        match self.try_route(method, template, handler) {
            Ok(handle) => handle,
            Err(err) => panic!("invalid route {method} {template}: {err}"),
        }
    }

    pub fn get<F, R>(&mut self, template: &str, handler: F) -> RouteHandle<'_>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(HttpMethod::Get, template, Handler::callable(handler))
    }

    pub fn post<F, R>(&mut self, template: &str, handler: F) -> RouteHandle<'_>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(HttpMethod::Post, template, Handler::callable(handler))
    }

    pub fn put<F, R>(&mut self, template: &str, handler: F) -> RouteHandle<'_>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(HttpMethod::Put, template, Handler::callable(handler))
    }

    pub fn patch<F, R>(&mut self, template: &str, handler: F) -> RouteHandle<'_>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(HttpMethod::Patch, template, Handler::callable(handler))
    }

    pub fn delete<F, R>(&mut self, template: &str, handler: F) -> RouteHandle<'_>
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.route(HttpMethod::Delete, template, Handler::callable(handler))
    }

    /// Register routes under a prefix and/or shared middleware.
    ///
    /// Groups nest: prefixes concatenate and outer middleware runs first.
    /// The previous group state is restored when `routes` returns.
    pub fn group(&mut self, group: Group, routes: impl FnOnce(&mut Router)) {
        self.groups.push(group);
        routes(self);
        self.groups.pop();
    }

    /// Middleware that wraps every matched route.
    pub fn layer(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.layers.push(MiddlewareRef::shared(middleware));
        self
    }

    pub fn layer_ref(&mut self, middleware: MiddlewareRef) -> &mut Self {
        self.layers.push(middleware);
        self
    }

    pub fn controller(&mut self, name: impl Into<String>, controller: impl Controller + 'static) -> &mut Self {
        self.controllers.register(name, controller);
        self
    }

    /// Pattern text of a named route.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.table.pattern_for(name)
    }

    /// Build a path for a named route from placeholder values.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlError> {
        let route = self
            .table
            .named(name)
            .ok_or_else(|| UrlError::UnknownRoute(name.to_string()))?;
        route.pattern().fill(name, params)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve and run one request. Never fails: every outcome is a response.
    pub fn dispatch(&self, mut request: Request) -> Response {
        let start = Instant::now();
        let method = request.method();
        let span = tracing::debug_span!("dispatch", %method, path = %request.path());
        let _guard = span.enter();

        let matched = match self.table.resolve(method, request.path()) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::debug!(error = %err, "Route resolution failed");
                let response = Response::from(&err);
                metrics::record_request(method.as_str(), response.status().as_u16(), "unmatched", start);
                return response;
            }
        };

        let route = matched.route;
        request.set_route_parameters(matched.params);

        let pipeline = Pipeline::from_refs(self.layers.iter().chain(route.middleware()));
        let terminal = |request: Request| self.invoke(route, request);

        let response = match panic::catch_unwind(AssertUnwindSafe(|| pipeline.handle(request, &terminal))) {
            Ok(response) => response,
            Err(payload) => {
                tracing::error!(
                    route = %route.pattern(),
                    panic = %panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                internal_error()
            }
        };

        metrics::record_request(
            method.as_str(),
            response.status().as_u16(),
            route.pattern().template(),
            start,
        );
        response
    }

    fn invoke(&self, route: &Route, request: Request) -> Response {
        let result = match route.handler() {
            Handler::Callable(handler) => handler(&request),
            Handler::Controller { controller, action } => {
                match self.controllers.call(controller, action, &request) {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::error!(error = %err, "Controller resolution failed");
                        return Response::from(&err);
                    }
                }
            }
        };

        match result {
            Ok(reply) => reply.into_response(),
            Err(err) => error_response(err),
        }
    }

    fn prefixed(&self, template: &str) -> String {
        let mut full = String::new();
        for group in &self.groups {
            let prefix = group.prefix.trim_matches('/');
            if !prefix.is_empty() {
                full.push('/');
                full.push_str(prefix);
            }
        }
        let rest = template.trim_start_matches('/');
        if !rest.is_empty() || full.is_empty() {
            full.push('/');
            full.push_str(rest);
        }
        full
    }
}

fn error_response(err: HandlerError) -> Response {
    match err {
        HandlerError::Validation(failed) => Response::validation_failed(failed.result()),
        HandlerError::Status { status, message } => {
            Response::error(status, status.canonical_reason().unwrap_or("Error"), message)
        }
        HandlerError::Internal(err) => {
            tracing::error!(error = %err, "Handler failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    Response::error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "InternalError",
        "Internal server error",
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
