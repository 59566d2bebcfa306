use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": if state.stopping.is_cancelled() { "stopping" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.config.storage.backend,
        "wizards": state.dispatcher.engine().registry().len(),
        "in_flight": state.dispatcher.in_flight(),
    }))
}
