//! Isles - arena game server with an HTTP status endpoint.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use server::{LocalRealm, SharedState};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Isles v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("  Game port: {}", config.server.port);
    info!("  Status port: {}", config.server.status_port);
    info!("  Game mode: {}", config.game.game_mode);
    info!("  Max clients: {}", config.game.max_clients);

    let realm = LocalRealm::shared(&config.rewards);
    let state = server::shared_state(&config, realm);

    let app = Router::new()
        .route("/health", get(health))
        .route("/round", get(round_status))
        .with_state(state.clone())
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.status_port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Status endpoint on http://{}", addr);

    tokio::select! {
        result = server::run(config, state) => {
            if let Err(e) = &result {
                error!("Game server stopped: {}", e);
            }
            result
        }
        result = axum::serve(listener, app) => {
            result?;
            Ok(())
        }
    }
}

async fn health() -> impl IntoResponse {
    "ok"
}

async fn round_status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.read().await.status())
}
