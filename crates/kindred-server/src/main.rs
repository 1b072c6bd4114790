use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use kindred_api::chat::ChatRelay;
use kindred_api::config::Config;
use kindred_api::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindred=debug,kindred_api=debug,kindred_db=info,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;
    if config.auth.uses_placeholder_secret() {
        warn!("KINDRED_JWT_SECRET is unset or a placeholder; session tokens can be forged. Set it before deploying.");
    }

    // Init database
    let db = kindred_db::Database::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;

    let chat = ChatRelay::new(config.chat.clone());
    info!(
        model = %chat.config().model,
        endpoint = %chat.config().endpoint,
        "chat relay configured"
    );

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        auth: config.auth.clone(),
        chat,
    });

    let app = kindred_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Kindred server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Kindred server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
