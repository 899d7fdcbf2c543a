use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::warn;

use wouldyou_core::QuestionGenerator;
use wouldyou_types::api::HealthResponse;

use crate::state::AppState;

/// GET /api/health: liveness plus a store round trip (no auth).
pub async fn health<G: QuestionGenerator + 'static>(State(state): State<AppState<G>>) -> impl IntoResponse {
    let ping = state
        .blocking(|svc| Ok(svc.database().ping()?))
        .await;

    let (status, db) = match ping {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
        }
    };

    let body = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" },
        timestamp: chrono::Utc::now(),
        db,
    };
    (status, Json(body))
}
