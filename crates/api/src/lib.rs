//! HTTP surface for the shop assistant.
//!
//! # Endpoints
//!
//! - `GET /health` - liveness plus store size
//! - `POST /api/v1/messages` - `{"content": "..."}` → `{"answer": "...", "turns": n}`
//! - `GET /api/v1/history` - the conversation so far
//!
//! The process hosts exactly one conversation.

pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/messages", post(routes::send_message))
        .route("/api/v1/history", get(routes::history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting aisle API server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
