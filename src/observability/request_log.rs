//! Per-request access logging as a dispatch middleware.

use std::time::Instant;

use crate::http::{Request, Response};
use crate::middleware::{Middleware, Next};

/// Logs method, path, status and elapsed time for each matched request.
///
/// Request ids come from the `x-request-id` header set at the transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn handle(&self, request: Request, next: Next<'_>) -> Response {
        let start = Instant::now();
        let method = request.method();
        let path = request.path().to_string();
        let request_id = request.header("x-request-id").map(str::to_string);

        let response = next.run(request);

        let status = response.status().as_u16();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if response.status().is_server_error() {
            tracing::warn!(%method, %path, status, elapsed_ms, request_id = ?request_id, "Request failed");
        } else {
            tracing::info!(%method, %path, status, elapsed_ms, request_id = ?request_id, "Request handled");
        }
        response
    }

    fn name(&self) -> &'static str {
        "request_logger"
    }
}
