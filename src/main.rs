//! Switchyard demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server (axum: request id, trace, timeout, body cap)
//!                    │
//!                    ▼
//!               Request::from_http
//!                    │
//!                    ▼
//!               Router::dispatch ──▶ RouteTable::resolve ──▶ 404 / 405
//!                    │
//!                    ▼
//!               Pipeline (global layers → group middleware → route middleware)
//!                    │
//!                    ▼
//!               handler / controller@action ──▶ Validator
//!                    │
//!     Client ◀── Response (JSON, text, 204, 422 validation map)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{load_config, validate_config, AppConfig, ConfigError};
use switchyard::observability::{logging, metrics, RequestLogger};
use switchyard::routing::{ActionController, Group, Handler, Router};
use switchyard::security::RateLimiter;
use switchyard::validation::{RuleCache, RuleSet, Validator};
use switchyard::{HandlerError, HttpMethod, HttpServer, Response, RuleError, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "switchyard", version, about = "Routing and validation demo server")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Invalid)?;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "switchyard starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = Arc::new(build_router(&config)?);
    tracing::info!(routes = router.routes().len(), "Routes registered");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    HttpServer::new(router, &config)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(config: &AppConfig) -> Result<Router, RuleError> {
    let validator = if config.validation.cache_rules {
        Validator::with_cache(RuleCache::new())
    } else {
        Validator::uncached()
    };
    let new_user = RuleSet::parse([
        ("name", "required|alpha|min:2|max:40"),
        ("email", "required|email"),
        ("age", "integer|min:18|max:120|onError('You must be between 18 and 120.')"),
    ])?;

    let mut router = Router::new();
    if config.observability.request_logging {
        router.layer(RequestLogger);
    }
    if config.rate_limit.enabled {
        router.layer(RateLimiter::from_config(&config.rate_limit));
    }

    router
        .get("/", |_| Ok(json!({"service": "switchyard", "version": env!("CARGO_PKG_VERSION")})))
        .name("home");
    router.get("/health", |_| Ok("ok")).name("health");

    router.controller(
        "posts",
        ActionController::new()
            .action("index", |req| {
                let page = req.query("page").unwrap_or("1");
                Ok(json!({"posts": [], "page": page}))
            })
            .action("show", |req| {
                Ok(json!({"slug": req.route_parameter("slug")}))
            }),
    );

    router.group(Group::new().prefix("/api"), |api| {
        api.get("/users/{id:int}", |req| {
            let id: u64 = match req.route_parameters().parse("id") {
                Some(Ok(id)) => id,
                _ => return Err(HandlerError::status(StatusCode::BAD_REQUEST, "invalid id")),
            };
            Ok(json!({"id": id}))
        })
        .name("users.show");

        api.post("/users", move |req| {
            validator.validate_with(&req.input(), &new_user).into_result()?;
            Ok(Response::json(&json!({"created": req.body_field("name")})).with_status(StatusCode::CREATED))
        })
        .name("users.store");

        api.route(HttpMethod::Get, "/posts", Handler::controller("posts", "index"))
            .name("posts.index");
        api.route(HttpMethod::Get, "/posts/{slug:slug}", Handler::controller("posts", "show"))
            .name("posts.show");
    });

    Ok(router)
}
