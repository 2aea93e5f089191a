//! Onion-style middleware composition.

use std::sync::Arc;

use crate::http::{Request, Response};
use crate::middleware::{Middleware, MiddlewareRef};

/// The remainder of the chain, handed to each middleware.
pub struct Next<'a> {
    layers: &'a [Arc<dyn Middleware>],
    terminal: &'a (dyn Fn(Request) -> Response + 'a),
}

impl Next<'_> {
    /// Invoke the rest of the chain.
    pub fn run(self, request: Request) -> Response {
        match self.layers.split_first() {
            Some((first, rest)) => first.handle(
                request,
                Next {
                    layers: rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(request),
        }
    }
}

/// Ordered middleware wrapping a terminal handler.
///
/// Building a pipeline has no side effects; all work happens in `handle`.
#[derive(Default, Clone)]
pub struct Pipeline {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self { layers }
    }

    /// Instantiate each reference; per-request refs produce new instances here.
    pub fn from_refs<'r>(refs: impl IntoIterator<Item = &'r MiddlewareRef>) -> Self {
        Self {
            layers: refs.into_iter().map(MiddlewareRef::instantiate).collect(),
        }
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run `request` through every layer, then `terminal`.
    pub fn handle(&self, request: Request, terminal: &dyn Fn(Request) -> Response) -> Response {
        Next {
            layers: &self.layers,
            terminal,
        }
        .run(request)
    }

    /// The composed chain as a single callable.
    pub fn compose<'a, H>(&'a self, terminal: H) -> impl Fn(Request) -> Response + 'a
    where
        H: Fn(Request) -> Response + 'a,
    {
        move |request| self.handle(request, &terminal)
    }
}
