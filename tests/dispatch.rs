//! End-to-end dispatch behavior through the public API.

mod common;

use std::sync::Arc;
use std::thread;

use axum::http::StatusCode;
use serde_json::json;
use switchyard::routing::ActionController;
use switchyard::{
    from_fn, Group, Handler, HttpMethod, MiddlewareRef, Request, Response, Router, RuleSet,
    Validator,
};

use common::{get, post_json, recording, Trace};

#[test]
fn test_trailing_slash_and_query_are_ignored() {
    let mut router = Router::new();
    router.get("/reports/{year:int}", |req| {
        Ok(json!({"year": req.route_parameter("year")}))
    });

    for path in ["/reports/2024", "/reports/2024/", "reports/2024?format=csv"] {
        let response = router.dispatch(get(path));
        assert_eq!(response.status(), StatusCode::OK, "path {path}");
        assert_eq!(response.json_body(), Some(json!({"year": "2024"})));
    }
}

#[test]
fn test_typed_placeholder_rejects_mismatch() {
    let mut router = Router::new();
    router.get("/users/{id:int}", |_| Ok(()));

    assert_eq!(router.dispatch(get("/users/12a")).status(), StatusCode::NOT_FOUND);
    assert_eq!(router.dispatch(get("/users/12")).status(), StatusCode::NO_CONTENT);
}

#[test]
fn test_first_registered_match_wins() {
    let mut router = Router::new();
    router.get("/users/{id:int}", |req| {
        Ok(json!({"by": "id", "id": req.route_parameter("id")}))
    });
    router.get("/users/{slug}", |req| {
        Ok(json!({"by": "slug", "slug": req.route_parameter("slug")}))
    });

    assert_eq!(
        router.dispatch(get("/users/42")).json_body(),
        Some(json!({"by": "id", "id": "42"}))
    );
    assert_eq!(
        router.dispatch(get("/users/ada")).json_body(),
        Some(json!({"by": "slug", "slug": "ada"}))
    );
}

#[test]
fn test_wrong_method_is_405_with_allow() {
    let mut router = Router::new();
    router.post("/login", |_| Ok(()));
    router.delete("/login", |_| Ok(()));

    let response = router.dispatch(get("/login"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("POST, DELETE"));
    let body = response.json_body().unwrap();
    assert_eq!(body["error"], "MethodNotAllowed");
    assert_eq!(body["code"], 405);

    let response = router.dispatch(get("/logout"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.json_body().unwrap()["error"], "RouteNotFound");
}

#[test]
fn test_resolution_failure_runs_no_middleware() {
    let trace = Trace::default();
    let mut router = Router::new();
    router.layer(recording("global", &trace));
    router.get("/only", |_| Ok(())).middleware(recording("route", &trace));

    router.dispatch(get("/missing"));
    router.dispatch(Request::new(HttpMethod::Put, "/only"));
    assert!(trace.entries().is_empty());
}

#[test]
fn test_middleware_onion_order() {
    let trace = Trace::default();
    let handler_trace = trace.clone();

    let mut router = Router::new();
    router
        .get("/x", move |_| {
            handler_trace.push("H");
            Ok(())
        })
        .middleware(recording("m1", &trace))
        .middleware(recording("m2", &trace));

    router.dispatch(get("/x"));
    assert_eq!(
        trace.entries(),
        vec!["before-m1", "before-m2", "H", "after-m2", "after-m1"]
    );
}

#[test]
fn test_short_circuit_stops_the_chain() {
    let trace = Trace::default();
    let handler_trace = trace.clone();

    let mut router = Router::new();
    router
        .get("/private", move |_| {
            handler_trace.push("H");
            Ok(())
        })
        .middleware(from_fn(|req, next| {
            if req.header("authorization").is_none() {
                return Response::error(StatusCode::UNAUTHORIZED, "Unauthorized", "login required");
            }
            next.run(req)
        }))
        .middleware(recording("inner", &trace));

    let response = router.dispatch(get("/private"));
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(trace.entries().is_empty());

    let response = router.dispatch(get("/private").with_header("authorization", "Bearer t"));
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(trace.entries(), vec!["before-inner", "H", "after-inner"]);
}

#[test]
fn test_request_mutation_visible_downstream() {
    let mut router = Router::new();
    router
        .get("/whoami", |req| Ok(req.header("x-user").unwrap_or("nobody").to_string()))
        .middleware(from_fn(|req, next| next.run(req.with_header("x-user", "ada"))));

    assert_eq!(router.dispatch(get("/whoami")).body(), "ada");
}

#[test]
fn test_route_parameters_win_over_body() {
    let mut router = Router::new();
    router.post("/accounts/{id:int}", |req| {
        let input = req.input();
        Ok(json!({"id": input["id"], "note": input["note"]}))
    });

    let response = router.dispatch(
        post_json("/accounts/7?note=query", json!({"id": "99", "note": "body"})),
    );
    assert_eq!(response.json_body(), Some(json!({"id": "7", "note": "body"})));
}

#[test]
fn test_reply_normalization() {
    let mut router = Router::new();
    router.get("/json", |_| Ok(json!({"ok": true})));
    router.get("/text", |_| Ok("plain"));
    router.get("/empty", |_| Ok(()));
    router.get("/custom", |_| {
        Ok(Response::content("made").with_status(StatusCode::ACCEPTED))
    });

    let json = router.dispatch(get("/json"));
    assert_eq!(json.header("content-type"), Some("application/json"));
    assert_eq!(json.json_body(), Some(json!({"ok": true})));

    let text = router.dispatch(get("/text"));
    assert_eq!(text.status(), StatusCode::OK);
    assert_eq!(text.body(), "plain");

    let empty = router.dispatch(get("/empty"));
    assert_eq!(empty.status(), StatusCode::NO_CONTENT);
    assert!(empty.body().is_empty());

    assert_eq!(router.dispatch(get("/custom")).status(), StatusCode::ACCEPTED);
}

fn signup_router() -> Router {
    let rules = RuleSet::parse([
        ("name", "required"),
        ("email", "required|email|onError('bad email')"),
        ("age", "min:18|integer|max:120"),
        ("username", "min:3|max:20"),
    ])
    .unwrap();
    let validator = Validator::new();

    let mut router = Router::new();
    router.post("/signup", move |req| {
        validator.validate_with(&req.input(), &rules).into_result()?;
        Ok(Response::no_content().with_status(StatusCode::CREATED))
    });
    router
}

#[test]
fn test_validation_failure_is_422_with_field_map() {
    let router = signup_router();
    let response = router.dispatch(post_json(
        "/signup",
        json!({"name": "", "email": "bad", "age": "17", "username": "jo"}),
    ));

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json_body(),
        Some(json!({
            "valid": false,
            "errors": {
                "name": ["The name field is required."],
                "email": ["bad email"],
                "age": ["The age must be at least 18."],
                "username": ["The username must be at least 3 characters."],
            }
        }))
    );
}

#[test]
fn test_validation_edges() {
    let router = signup_router();

    let response = router.dispatch(post_json(
        "/signup",
        json!({"name": "Ada", "email": "", "age": "150", "username": "john"}),
    ));
    let body = response.json_body().unwrap();
    assert_eq!(body["errors"]["email"], json!(["The email field is required."]));
    assert_eq!(body["errors"]["age"], json!(["The age may not be greater than 120."]));
    assert!(body["errors"].get("username").is_none());

    let response = router.dispatch(post_json(
        "/signup",
        json!({"name": "Ada", "email": "ada@example.com", "age": "45", "username": "john"}),
    ));
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[test]
fn test_named_route_under_group_prefix() {
    let mut router = Router::new();
    router.group(Group::new().prefix("/admin"), |admin| {
        admin.get("/dashboard", |_| Ok("dash")).name("dashboard");
    });

    assert_eq!(router.resolve("dashboard"), Some("/admin/dashboard"));
    assert_eq!(router.url_for("dashboard", &[]).unwrap(), "/admin/dashboard");
    assert_eq!(router.dispatch(get("/admin/dashboard")).body(), "dash");
    assert_eq!(router.dispatch(get("/dashboard")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_group_middleware_scoped_to_group() {
    let trace = Trace::default();
    let mut router = Router::new();
    router.group(Group::new().prefix("/api").middleware(recording("api", &trace)), |api| {
        api.get("/ping", |_| Ok("pong"));
    });
    router.get("/ping", |_| Ok("pong"));

    router.dispatch(get("/ping"));
    assert!(trace.entries().is_empty());

    router.dispatch(get("/api/ping"));
    assert_eq!(trace.entries(), vec!["before-api", "after-api"]);
}

#[test]
fn test_per_request_middleware_is_fresh() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl switchyard::Middleware for Counter {
        fn handle(&self, request: Request, next: switchyard::Next<'_>) -> Response {
            let seen = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            next.run(request).with_header("x-seen", &seen.to_string())
        }
    }

    let mut router = Router::new();
    router
        .get("/fresh", |_| Ok(()))
        .middleware_ref(MiddlewareRef::per_request(|| Counter(AtomicUsize::new(0))));
    router
        .get("/shared", |_| Ok(()))
        .middleware(Counter(AtomicUsize::new(0)));

    for _ in 0..3 {
        assert_eq!(router.dispatch(get("/fresh")).header("x-seen"), Some("1"));
    }
    router.dispatch(get("/shared"));
    assert_eq!(router.dispatch(get("/shared")).header("x-seen"), Some("2"));
}

#[test]
fn test_controller_resolution() {
    let mut router = Router::new();
    router.controller(
        "reports",
        ActionController::new().action("show", |req| {
            Ok(format!("report {}", req.route_parameter("id").unwrap_or("?")))
        }),
    );
    router.route(HttpMethod::Get, "/reports/{id:int}", Handler::controller("reports", "show"));
    router.route(HttpMethod::Get, "/reports", Handler::controller("reports", "index"));
    router.route(HttpMethod::Get, "/audits", Handler::controller("audits", "index"));

    assert_eq!(router.dispatch(get("/reports/3")).body(), "report 3");

    let missing_action = router.dispatch(get("/reports"));
    assert_eq!(missing_action.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(missing_action.json_body().unwrap()["error"], "ControllerMethodNotFound");

    let missing_controller = router.dispatch(get("/audits"));
    assert_eq!(missing_controller.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(missing_controller.json_body().unwrap()["error"], "ControllerNotFound");
}

#[test]
fn test_panics_in_middleware_are_contained() {
    let mut router = Router::new();
    router
        .get("/fragile", |_| Ok(()))
        .middleware(from_fn(|_, _| panic!("middleware bug")));

    let response = router.dispatch(get("/fragile"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json_body().unwrap()["error"], "InternalError");
}

#[test]
fn test_shared_router_across_threads() {
    let mut router = Router::new();
    router.get("/square/{n:int}", |req| {
        let n: u64 = req.route_parameters().parse("n").and_then(Result::ok).unwrap_or(0);
        Ok(json!({"square": n * n}))
    });
    let router = Arc::new(router);

    let handles: Vec<_> = (0..8u64)
        .map(|n| {
            let router = Arc::clone(&router);
            thread::spawn(move || router.dispatch(get(&format!("/square/{n}"))).json_body())
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        let n = n as u64;
        assert_eq!(handle.join().unwrap(), Some(json!({"square": n * n})));
    }
}
