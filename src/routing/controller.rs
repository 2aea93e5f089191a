//! Controller-style handlers.
//!
//! A route may name a `(controller, action)` pair instead of holding a
//! closure. The pair is looked up in the router's `ControllerRegistry` when the
//! route is dispatched: an unknown controller is `ControllerNotFound`, a known
//! controller without the action is `ControllerMethodNotFound`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{HandlerError, RoutingError};
use crate::http::{Reply, Request};
use crate::routing::route::{HandlerFn, HandlerResult};

pub trait Controller: Send + Sync {
    /// Run `action`, or `None` if this controller has no such action.
    fn invoke(&self, action: &str, request: &Request) -> Option<HandlerResult>;
}

/// A controller assembled from named closures.
#[derive(Default, Clone)]
pub struct ActionController {
    actions: HashMap<String, Arc<HandlerFn>>,
}

impl ActionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action<F, R>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Request) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.actions
            .insert(name.into(), Arc::new(move |request| f(request).map(Into::into)));
        self
    }
}

impl Controller for ActionController {
    fn invoke(&self, action: &str, request: &Request) -> Option<HandlerResult> {
        self.actions.get(action).map(|f| f(request))
    }
}

#[derive(Default, Clone)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, controller: impl Controller + 'static) {
        self.controllers.insert(name.into(), Arc::new(controller));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    pub fn call(&self, controller: &str, action: &str, request: &Request) -> Result<HandlerResult, RoutingError> {
        let target = self
            .controllers
            .get(controller)
            .ok_or_else(|| RoutingError::ControllerNotFound(controller.to_string()))?;

        target
            .invoke(action, request)
            .ok_or_else(|| RoutingError::ControllerMethodNotFound {
                controller: controller.to_string(),
                action: action.to_string(),
            })
    }
}
