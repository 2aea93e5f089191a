//! Request value consumed by the dispatcher.
//!
//! # Responsibilities
//! - Carry method, path, query, parsed body fields and headers
//! - Hold the route parameters written by the dispatcher after a match
//! - Merge all input sources into one field map for validation
//!
//! # Design Decisions
//! - `from_http` is the only constructor that reads transport state; the core
//!   dispatcher only ever receives an already-built `Request`
//! - Route parameters win over body fields, body fields win over query fields

use std::collections::HashMap;

use axum::http::request::Parts;
use axum::http::{header, Extensions, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::MethodError;
use crate::http::method::HttpMethod;
use crate::routing::pattern::{normalize_path, RouteParams};

/// Failure to turn transport data into a `Request`.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Method(#[from] MethodError),

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON body must be an object")]
    NotAnObject,
}

#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    path: String,
    query: HashMap<String, String>,
    body: Map<String, Value>,
    headers: HeaderMap,
    params: RouteParams,
    extensions: Extensions,
}

impl Request {
    /// Build a request from a method and a path that may carry a query string.
    pub fn new(method: HttpMethod, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (uri, HashMap::new()),
        };

        Self {
            method,
            path: normalize_path(path).into_owned(),
            query,
            body: Map::new(),
            headers: HeaderMap::new(),
            params: RouteParams::default(),
            extensions: Extensions::new(),
        }
    }

    /// Capture a request from the transport layer.
    ///
    /// JSON bodies must be objects; urlencoded form bodies become string fields.
    /// Other content types leave the body map empty.
    pub fn from_http(parts: &Parts, body: &[u8]) -> Result<Self, CaptureError> {
        let method = HttpMethod::try_from(&parts.method)?;
        let path = parts.uri.path();
        let query = parts.uri.query().map(parse_query).unwrap_or_default();

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let body = if body.is_empty() {
            Map::new()
        } else if content_type.starts_with("application/json") {
            match serde_json::from_slice::<Value>(body)? {
                Value::Object(map) => map,
                _ => return Err(CaptureError::NotAnObject),
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        } else {
            Map::new()
        };

        Ok(Self {
            method,
            path: normalize_path(path).into_owned(),
            query,
            body,
            headers: parts.headers.clone(),
            params: RouteParams::default(),
            extensions: Extensions::new(),
        })
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    /// Sets one body field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Header names or values that are not valid HTTP tokens are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Normalized path (no query string, no trailing slash except root).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn body_field(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_route_parameters(&mut self, params: RouteParams) {
        self.params = params;
    }

    pub fn route_parameter(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn route_parameters(&self) -> &RouteParams {
        &self.params
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// All input fields merged: query, then body, then route parameters.
    pub fn input(&self) -> Map<String, Value> {
        let mut merged: Map<String, Value> = self
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        for (k, v) in &self.body {
            merged.insert(k.clone(), v.clone());
        }
        for (k, v) in self.params.iter() {
            merged.insert(k.to_string(), Value::String(v.to_string()));
        }
        merged
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
