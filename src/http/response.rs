//! Response value produced by handlers and middleware.
//!
//! # Responsibilities
//! - JSON, plain-content and no-content construction
//! - Header addition returning a new value
//! - Error and validation-failure bodies in one fixed shape
//! - Normalizing handler return values (`Reply`) into a response
//!
//! # Design Decisions
//! - Bodies are held fully in memory; the core never streams
//! - Conversion to an axum response happens only at the transport boundary

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::RoutingError;
use crate::validation::ValidationResult;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Response {
    /// Empty body with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// 200 with a JSON body. Values that fail to serialize produce a 500.
    pub fn json(value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(StatusCode::OK)
                .with_header(header::CONTENT_TYPE.as_str(), JSON)
                .with_body(body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "Response could not be encoded",
                )
            }
        }
    }

    /// 200 with a plain-text body.
    pub fn content(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE.as_str(), TEXT)
            .with_body(body.into())
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// `{"error": <taxonomy>, "message": <message>, "code": <status>}`
    pub fn error(status: StatusCode, taxonomy: &str, message: impl Into<String>) -> Self {
        let body = json!({
            "error": taxonomy,
            "message": message.into(),
            "code": status.as_u16(),
        });
        Self::json(&body).with_status(status)
    }

    /// 422 with `{"valid": false, "errors": {field: [messages]}}`.
    pub fn validation_failed(result: &ValidationResult) -> Self {
        let body = json!({
            "valid": false,
            "errors": result.errors(),
        });
        Self::json(&body).with_status(StatusCode::UNPROCESSABLE_ENTITY)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with the header set. Invalid names or values are dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "Dropping invalid response header"),
        }
        self
    }

    fn with_body(mut self, body: String) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

impl From<&RoutingError> for Response {
    fn from(err: &RoutingError) -> Self {
        let response = Response::error(err.status(), err.taxonomy(), err.to_string());
        match err {
            RoutingError::MethodNotAllowed { allowed, .. } => {
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                response.with_header(header::ALLOW.as_str(), &allow)
            }
            _ => response,
        }
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(axum::body::Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// What a handler may return; normalized by `into_response`.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Structured data, encoded as JSON.
    Json(Value),
    Content(String),
    /// Nothing; becomes 204.
    Empty,
    Response(Response),
}

impl Reply {
    pub fn into_response(self) -> Response {
        match self {
            Reply::Json(value) => Response::json(&value),
            Reply::Content(body) => Response::content(body),
            Reply::Empty => Response::no_content(),
            Reply::Response(response) => response,
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Reply::Content(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Reply::Content(body.to_string())
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}
