//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that funnels every request into `Router::dispatch`
//! - Wire up transport middleware (request ID, tracing, timeout)
//! - Buffer and cap request bodies before capture
//! - Run synchronous dispatch on the blocking pool
//! - Serve until the shutdown channel fires

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::request::{CaptureError, Request};
use crate::http::response::Response;
use crate::routing::Router;

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    router: Arc<Router>,
    max_body_bytes: usize,
}

/// HTTP front end for a finished `Router`.
pub struct HttpServer {
    app: axum::Router,
}

impl HttpServer {
    pub fn new(router: Arc<Router>, config: &AppConfig) -> Self {
        Self {
            app: build_app(router, config),
        }
    }

    /// The Axum service, for driving requests without a socket.
    pub fn app(&self) -> axum::Router {
        self.app.clone()
    }

    /// Run the server until `shutdown` receives a value or its sender is dropped.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all transport layers.
#[allow(deprecated)]
pub fn build_app(router: Arc<Router>, config: &AppConfig) -> axum::Router {
    let state = AppState {
        router,
        max_body_bytes: config.listener.max_body_bytes,
    };

    axum::Router::new()
        .fallback(dispatch_handler)
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn dispatch_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_bytes, "Request body rejected");
            return Response::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "PayloadTooLarge",
                "Request body too large",
            )
            .into_response();
        }
    };

    let request = match Request::from_http(&parts, &bytes) {
        Ok(request) => request,
        Err(CaptureError::Method(e)) => {
            tracing::debug!(error = %e, "Unsupported method");
            return Response::error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", e.to_string())
                .into_response();
        }
        Err(e) => {
            tracing::debug!(error = %e, "Malformed request body");
            return Response::error(StatusCode::BAD_REQUEST, "BadRequest", e.to_string()).into_response();
        }
    };

    // Handlers are synchronous; keep them off the async workers so the
    // timeout layer can still fire.
    let router = Arc::clone(&state.router);
    match tokio::task::spawn_blocking(move || router.dispatch(request)).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            Response::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "Internal server error",
            )
            .into_response()
        }
    }
}
