use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::api::{AnalyticsEvent, SuccessResponse};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/analytics/track", post(track))
}

/// POST /api/analytics/track - Record a product event in the server log.
async fn track(
    payload: Result<Json<AnalyticsEvent>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(event) = payload.map_err(|e| {
        warn!("Rejected analytics event: {e}");
        ApiError::BadRequest("Failed to track event".to_string())
    })?;
    info!(target: "analytics", event = ?event, "Tracked event");
    Ok(Json(SuccessResponse { success: true }))
}
