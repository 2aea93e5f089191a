//! Error taxonomy.
//!
//! # Categories
//! - Configuration errors (`PatternError`, `RuleError`, `MethodError`): raised while routes and
//!   rule-strings are registered. They describe programming mistakes and abort startup.
//! - Resolution errors (`RoutingError`): raised per request before any middleware runs.
//! - Handler errors (`HandlerError`): returned by route handlers, translated by the dispatcher.

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::method::HttpMethod;
use crate::validation::ValidationFailed;

/// Boxed error used for opaque handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to interpret a method token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
}

/// Route template compilation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unknown placeholder type `{kind}` for parameter `{name}` in `{pattern}`")]
    InvalidPatternType {
        pattern: String,
        name: String,
        kind: String,
    },

    #[error("duplicate parameter `{name}` in `{pattern}`")]
    DuplicateParameter { pattern: String, name: String },

    #[error("malformed placeholder `{segment}` in `{pattern}`")]
    MalformedPlaceholder { pattern: String, segment: String },

    #[error("invalid parameter name `{name}` in `{pattern}`")]
    InvalidParameterName { pattern: String, name: String },
}

/// Rule-string parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unknown validation rule `{0}`")]
    UnknownRule(String),

    #[error("rule `{rule}` requires a parameter")]
    MissingParameter { rule: String },

    #[error("rule `{rule}` has an invalid parameter `{param}`")]
    InvalidParameter { rule: String, param: String },

    #[error("invalid regular expression `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("unterminated onError clause in `{0}`")]
    UnterminatedMessage(String),
}

/// Per-request resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no route matches {path}")]
    RouteNotFound { path: String },

    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        method: HttpMethod,
        path: String,
        allowed: Vec<HttpMethod>,
    },

    #[error("controller `{0}` is not registered")]
    ControllerNotFound(String),

    #[error("controller `{controller}` has no action `{action}`")]
    ControllerMethodNotFound { controller: String, action: String },
}

impl RoutingError {
    /// HTTP status this error is surfaced as.
    pub fn status(&self) -> StatusCode {
        match self {
            RoutingError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            RoutingError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RoutingError::ControllerNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RoutingError::ControllerMethodNotFound { .. } => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Stable taxonomy name used in error bodies.
    pub fn taxonomy(&self) -> &'static str {
        match self {
            RoutingError::RouteNotFound { .. } => "RouteNotFound",
            RoutingError::MethodNotAllowed { .. } => "MethodNotAllowed",
            RoutingError::ControllerNotFound(_) => "ControllerNotFound",
            RoutingError::ControllerMethodNotFound { .. } => "ControllerMethodNotFound",
        }
    }
}

/// Failures while building a URL from a named route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("no route is named `{0}`")]
    UnknownRoute(String),

    #[error("route `{route}` needs parameter `{name}`")]
    MissingParameter { route: String, name: String },

    #[error("value `{value}` for `{name}` in route `{route}` is not a valid {kind}")]
    InvalidParameter {
        route: String,
        name: String,
        value: String,
        kind: String,
    },
}

/// Error returned by route handlers and controller actions.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Input failed rule validation; surfaced as 422 with the per-field map.
    #[error(transparent)]
    Validation(#[from] ValidationFailed),

    /// Deliberate abort with a specific status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// Anything else; surfaced as a generic 500.
    #[error(transparent)]
    Internal(BoxError),
}

impl HandlerError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        HandlerError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn internal(err: impl Into<BoxError>) -> Self {
        HandlerError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_statuses() {
        let not_found = RoutingError::RouteNotFound { path: "/x".into() };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.taxonomy(), "RouteNotFound");

        let not_allowed = RoutingError::MethodNotAllowed {
            method: HttpMethod::Get,
            path: "/x".into(),
            allowed: vec![HttpMethod::Post],
        };
        assert_eq!(not_allowed.status(), StatusCode::METHOD_NOT_ALLOWED);

        let missing = RoutingError::ControllerMethodNotFound {
            controller: "users".into(),
            action: "show".into(),
        };
        assert_eq!(missing.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(missing.to_string(), "controller `users` has no action `show`");
    }
}
