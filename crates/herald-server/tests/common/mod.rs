#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use herald_db::{create_pool, run_migrations, DbRuntimeSettings};
use herald_events::Bus;
use herald_server::{app, auth::Authenticator, build_api, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub bus: Bus,
}

pub fn test_app() -> TestApp {
    test_app_with(false)
}

pub fn test_app_with(require_auth_for_subscriptions: bool) -> TestApp {
    let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();

    let authenticator = Arc::new(Authenticator::new(b"integration-test-secret", 3600).unwrap());
    let api = build_api(Arc::clone(&authenticator)).unwrap();
    let state = AppState::new(pool, api, authenticator, require_auth_for_subscriptions);
    let bus = state.bus.clone();

    TestApp {
        router: app(state),
        bus,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Calls `POST /api/ops`.
    pub async fn op(
        &self,
        token: Option<&str>,
        operation: &str,
        args: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/ops")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = json!({ "operation": operation, "args": args }).to_string();
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Calls an operation that must succeed and returns its `data`.
    pub async fn ok(&self, token: Option<&str>, operation: &str, args: Value) -> Value {
        let (status, body) = self.op(token, operation, args).await;
        assert_eq!(status, StatusCode::OK, "{operation} failed: {body}");
        body["data"].clone()
    }

    /// Registers a user and logs in. Returns `(user_id, token)`.
    pub async fn sign_up(&self, name: &str) -> (i64, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        self.ok(
            None,
            "Mutation.createUser",
            json!({ "name": name, "email": email, "password": "password123" }),
        )
        .await;
        let login = self
            .ok(
                None,
                "Mutation.login",
                json!({ "email": email, "password": "password123" }),
            )
            .await;
        (
            login["user"]["id"].as_i64().unwrap(),
            login["token"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a post as the token's owner and returns it.
    pub async fn create_post(&self, token: &str, title: &str, published: bool) -> Value {
        self.ok(
            Some(token),
            "Mutation.createPost",
            json!({ "title": title, "body": format!("{title} body"), "published": published }),
        )
        .await
    }
}
