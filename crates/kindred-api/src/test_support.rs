use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use serde_json::Value;
use tower::ServiceExt;

use kindred_db::Database;

use crate::chat::ChatRelay;
use crate::config::{AuthConfig, ChatConfig, DEFAULT_CHAT_MODEL};
use crate::{AppState, AppStateInner, router};

pub const TEST_SECRET: &str = "test-secret";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        algorithm: Algorithm::HS256,
        token_ttl: chrono::Duration::hours(24),
    }
}

/// State over a fresh in-memory database, relaying chat to `endpoint`.
pub fn test_state(endpoint: &str) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        auth: auth_config(),
        chat: ChatRelay::new(ChatConfig {
            endpoint: endpoint.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            persona: "be kind".to_string(),
        }),
    })
}

/// An app whose chat upstream is unreachable.
pub fn test_app() -> Router {
    router(test_state("http://127.0.0.1:9/api/generate"))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with_token(app, method, uri, body, None).await
}

pub async fn send_with_token(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
