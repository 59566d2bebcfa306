//! Update receiver.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use formbot_types::event::Update;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub user_id: i64,
}

/// POST /updates - Accept one update for background processing.
///
/// Responds 202 as soon as the update is queued; replies go out through the
/// transport, not in the response body.
pub async fn receive_update(
    State(state): State<AppState>,
    payload: Result<Json<Update>, JsonRejection>,
) -> Result<ApiResponse<Accepted>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if state.stopping.is_cancelled() {
        return Err(AppError::ShuttingDown);
    }
    let Json(update) = payload?;
    let user_id = update.user_id();

    tracing::debug!(%request_id, user_id, "update accepted");
    state.dispatcher.handle_update(update);

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(Accepted { user_id }, request_id, elapsed)
        .with_status(StatusCode::ACCEPTED))
}
