//! HTTP route handlers.

use std::sync::Arc;

use aisle_common::{AisleError, Turn};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub stored_records: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        stored_records: state.assistant.store().len().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub answer: String,
    /// Turns in the conversation after this one
    pub turns: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip)]
    pub status: StatusCode,
}

impl From<AisleError> for ErrorResponse {
    fn from(e: AisleError) -> Self {
        let (status, code) = match &e {
            AisleError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AisleError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            AisleError::EmbeddingUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "EMBEDDING_UNAVAILABLE")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        Self {
            error: e.to_string(),
            code,
            status,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Ask the assistant one question.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ErrorResponse> {
    info!(
        content_preview = %request.content.chars().take(50).collect::<String>(),
        "Received message"
    );

    let answer = state.assistant.run(&request.content).await.map_err(|e| {
        error!(error = %e, "Turn failed");
        ErrorResponse::from(e)
    })?;

    Ok(Json(MessageResponse {
        answer,
        turns: state.assistant.turns().await,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<Turn>,
}

pub async fn history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        turns: state.assistant.history().await,
    })
}
