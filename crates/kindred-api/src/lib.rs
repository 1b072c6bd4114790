pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod posts;
pub mod token;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kindred_db::Database;

use crate::chat::ChatRelay;
use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Request bodies carry base64 images inline, so allow more than axum's 2 MiB.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub auth: AuthConfig,
    pub chat: ChatRelay,
}

/// Assemble every route with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/chat/{model_id}", post(chat::chat))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

/// Run blocking work (SQLite, password hashing) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
