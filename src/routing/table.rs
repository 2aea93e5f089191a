//! Ordered route storage and resolution.
//!
//! # Design Decisions
//! - Registration order is match priority; no specificity ranking
//! - First route whose method and pattern both match wins
//! - A path that matches only under other methods is a 405, never a 404

use std::collections::HashMap;

use crate::error::RoutingError;
use crate::http::HttpMethod;
use crate::routing::pattern::{normalize_path, RouteParams};
use crate::routing::route::Route;

/// A successful resolution.
#[derive(Debug)]
pub struct RouteMatch<'t> {
    pub route: &'t Route,
    pub params: RouteParams,
}

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    names: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route; returns its index.
    pub fn push(&mut self, route: Route) -> usize {
        let index = self.routes.len();
        let name = route.name().map(str::to_string);
        self.routes.push(route);
        if let Some(name) = name {
            self.bind_name(index, name);
        }
        index
    }

    pub fn resolve(&self, method: HttpMethod, path: &str) -> Result<RouteMatch<'_>, RoutingError> {
        let path = normalize_path(path);
        let mut allowed: Vec<HttpMethod> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern().captures_params(&path) else {
                continue;
            };
            if route.method() == method {
                return Ok(RouteMatch { route, params });
            }
            if !allowed.contains(&route.method()) {
                allowed.push(route.method());
            }
        }

        if allowed.is_empty() {
            Err(RoutingError::RouteNotFound {
                path: path.into_owned(),
            })
        } else {
            Err(RoutingError::MethodNotAllowed {
                method,
                path: path.into_owned(),
                allowed,
            })
        }
    }

    /// Pattern text of a named route.
    pub fn pattern_for(&self, name: &str) -> Option<&str> {
        self.named(name).map(|route| route.pattern().template())
    }

    pub fn named(&self, name: &str) -> Option<&Route> {
        self.names.get(name).map(|&index| &self.routes[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn route(&self, index: usize) -> &Route {
        &self.routes[index]
    }

    pub(crate) fn route_mut(&mut self, index: usize) -> &mut Route {
        &mut self.routes[index]
    }

    pub(crate) fn set_name(&mut self, index: usize, name: String) {
        self.routes[index].set_name(name.clone());
        self.bind_name(index, name);
    }

    fn bind_name(&mut self, index: usize, name: String) {
        if let Some(previous) = self.names.insert(name.clone(), index) {
            if previous != index {
                tracing::warn!(name = %name, "Route name reassigned to a later route");
            }
        }
    }
}
