//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use switchyard::{from_fn, HttpMethod, Middleware, Request};

/// Ordered record of middleware and handler activity.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Middleware that records `before-<label>` and `after-<label>` around `next`.
pub fn recording(label: &'static str, trace: &Trace) -> impl Middleware {
    let trace = trace.clone();
    from_fn(move |request, next| {
        trace.push(format!("before-{label}"));
        let response = next.run(request);
        trace.push(format!("after-{label}"));
        response
    })
}

pub fn get(path: &str) -> Request {
    Request::new(HttpMethod::Get, path)
}

/// A POST request whose body fields come from a JSON object.
pub fn post_json(path: &str, body: Value) -> Request {
    Request::new(HttpMethod::Post, path).with_body(object(body))
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
