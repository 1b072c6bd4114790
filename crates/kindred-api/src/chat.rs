//! Relays chat prompts to the local inference server.
//!
//! Only the configured model id is relayed. Any other id is echoed back
//! without an outbound call, which existing clients rely on.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::{debug, warn};

use kindred_types::api::{ChatRequest, ChatResponse};

use crate::AppState;
use crate::config::ChatConfig;
use crate::error::ApiError;
use crate::extract::JsonBody;

/// Reported in the `error` field when the upstream could not be reached at all.
const UNREACHABLE_STATUS: u16 = 502;

/// Body of an upstream generate call.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

pub struct ChatRelay {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatRelay {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Forward `req.prompt` with the persona if `model_id` is the supported
    /// model. Upstream failures come back as [`ChatResponse::Failed`], never as
    /// an `Err`.
    pub async fn relay(&self, model_id: &str, req: ChatRequest) -> ChatResponse {
        if model_id != self.config.model {
            warn!(model_id, "chat requested for unsupported model; echoing request");
            return ChatResponse::PassThrough {
                item_name: req.model,
                llms_name: model_id.to_string(),
            };
        }

        let payload = GenerateRequest {
            model: &self.config.model,
            prompt: &req.prompt,
            system: &self.config.persona,
            stream: false,
        };

        debug!(endpoint = %self.config.endpoint, "relaying chat prompt");
        let response = match self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("chat upstream unreachable: {}", e);
                return ChatResponse::Failed {
                    item_name: req.model,
                    error: UNREACHABLE_STATUS,
                    data: e.to_string(),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("chat upstream body unreadable: {}", e);
                return ChatResponse::Failed {
                    item_name: req.model,
                    error: UNREACHABLE_STATUS,
                    data: e.to_string(),
                };
            }
        };

        if status == StatusCode::OK {
            ChatResponse::Completed {
                data: body,
                llms_name: model_id.to_string(),
            }
        } else {
            warn!(status = status.as_u16(), "chat upstream returned an error");
            ChatResponse::Failed {
                item_name: req.model,
                error: status.as_u16(),
                data: body,
            }
        }
    }
}

/// Upstream failures are reported inside a 200 body; only a malformed
/// request body is an error.
pub async fn chat(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(state.chat.relay(&model_id, req).await))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::State,
        http::{Method, StatusCode},
        routing::post,
    };
    use serde_json::{Value, json};

    use crate::router;
    use crate::test_support::{send, test_app, test_state};

    #[derive(Clone)]
    struct Stub {
        status: StatusCode,
        body: &'static str,
        hits: Arc<AtomicUsize>,
        last_payload: Arc<Mutex<Option<Value>>>,
    }

    async fn generate(State(stub): State<Stub>, Json(payload): Json<Value>) -> (StatusCode, &'static str) {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        *stub.last_payload.lock().unwrap() = Some(payload);
        (stub.status, stub.body)
    }

    /// Serve a fake inference endpoint; returns its URL and the stub handle.
    async fn spawn_stub(status: StatusCode, body: &'static str) -> (String, Stub) {
        let stub = Stub {
            status,
            body,
            hits: Arc::new(AtomicUsize::new(0)),
            last_payload: Arc::new(Mutex::new(None)),
        };
        let app = Router::new()
            .route("/api/generate", post(generate))
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/api/generate", addr), stub)
    }

    #[tokio::test]
    async fn supported_model_relays_upstream_body() {
        let (endpoint, stub) = spawn_stub(StatusCode::OK, r#"{"response":"hi"}"#).await;
        let app = router(test_state(&endpoint));

        let (status, body) = send(
            &app,
            Method::POST,
            "/chat/qwen2.5:3b",
            Some(json!({ "model": "qwen2.5:3b", "prompt": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "data": "{\"response\":\"hi\"}", "llms_name": "qwen2.5:3b" })
        );
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);

        let sent = stub.last_payload.lock().unwrap().clone().unwrap();
        assert_eq!(
            sent,
            json!({
                "model": "qwen2.5:3b",
                "prompt": "hello",
                "system": "be kind",
                "stream": false,
            })
        );
    }

    #[tokio::test]
    async fn upstream_error_is_reported_inline() {
        let (endpoint, stub) = spawn_stub(StatusCode::INTERNAL_SERVER_ERROR, "model not loaded").await;
        let app = router(test_state(&endpoint));

        let (status, body) = send(
            &app,
            Method::POST,
            "/chat/qwen2.5:3b",
            Some(json!({ "model": "qwen2.5:3b1", "prompt": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "item_name": "qwen2.5:3b1", "error": 500, "data": "model not loaded" })
        );
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_model_echoes_without_calling_upstream() {
        let (endpoint, stub) = spawn_stub(StatusCode::OK, "{}").await;
        let app = router(test_state(&endpoint));

        let (status, body) = send(
            &app,
            Method::POST,
            "/chat/unknown-model",
            Some(json!({ "model": "whatever", "prompt": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "item_name": "whatever", "llms_name": "unknown-model" })
        );
        assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_body_answers_with_detail() {
        let app = test_app();
        let (status, body) = send(&app, Method::POST, "/chat/qwen2.5:3b", None).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_reported_inline() {
        let app = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/chat/qwen2.5:3b",
            Some(json!({ "model": "qwen2.5:3b", "prompt": "hello" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item_name"], "qwen2.5:3b");
        assert_eq!(body["error"], 502);
        assert!(body["data"].is_string());
    }
}
