//! Transport adapter behavior: request capture, body limits, request ids, shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request as HttpRequest, StatusCode};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

use switchyard::http::build_app;
use switchyard::{AppConfig, HandlerError, HttpServer, Router, RuleSet, Shutdown, Validator};

fn router() -> Router {
    let rules = RuleSet::parse([("title", "required|max:10"), ("qty", "integer|min:1")]).unwrap();
    let validator = Validator::new();

    let mut router = Router::new();
    router.get("/items/{id:int}", |req| {
        Ok(json!({"id": req.route_parameter("id"), "page": req.query("page")}))
    });
    router.post("/items", move |req| -> Result<_, HandlerError> {
        validator.validate_with(&req.input(), &rules).into_result()?;
        Ok(json!({"title": req.body_field("title")}))
    });
    router
}

fn app_with(config: &AppConfig) -> axum::Router {
    build_app(Arc::new(router()), config)
}

fn app() -> axum::Router {
    app_with(&AppConfig::default())
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(content_type: &str, body: &'static str) -> HttpRequest<Body> {
    HttpRequest::post("/items")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_get_with_params_and_query() {
    let response = app()
        .oneshot(HttpRequest::get("/items/5/?page=2").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await, json!({"id": "5", "page": "2"}));
}

#[tokio::test]
async fn test_client_request_id_is_preserved() {
    let response = app()
        .oneshot(
            HttpRequest::get("/items/1")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_json_body_validation() {
    let response = app()
        .oneshot(post("application/json", r#"{"title": "far too long a title", "qty": "0"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await,
        json!({
            "valid": false,
            "errors": {
                "title": ["The title may not be longer than 10 characters."],
                "qty": ["The qty must be at least 1."],
            }
        })
    );

    let response = app()
        .oneshot(post("application/json", r#"{"title": "lamp", "qty": 2}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"title": "lamp"}));
}

#[tokio::test]
async fn test_form_body() {
    let response = app()
        .oneshot(post("application/x-www-form-urlencoded", "title=desk&qty=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"title": "desk"}));
}

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    for body in ["{not json", "[1, 2]"] {
        let response = app().oneshot(post("application/json", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(json_body(response).await["error"], "BadRequest");
    }
}

#[tokio::test]
async fn test_body_limit() {
    let mut config = AppConfig::default();
    config.listener.max_body_bytes = 16;

    let response = app_with(&config)
        .oneshot(post("application/json", r#"{"title": "this body is well past sixteen bytes"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let mut router = Router::new();
    router.get("/slow", |_| {
        std::thread::sleep(Duration::from_secs(2));
        Ok("done")
    });
    let mut config = AppConfig::default();
    config.timeouts.request_secs = 1;

    let started = std::time::Instant::now();
    let response = build_app(Arc::new(router), &config)
        .oneshot(HttpRequest::get("/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unsupported_method() {
    let response = app()
        .oneshot(
            HttpRequest::builder()
                .method("TRACE")
                .uri("/items/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_routing_errors_through_transport() {
    let response = app()
        .oneshot(HttpRequest::delete("/items/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET");

    let response = app()
        .oneshot(HttpRequest::get("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(Arc::new(router()), &AppConfig::default());
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /items/9 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {raw}");
    assert!(raw.contains(r#""id":"9""#));

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
