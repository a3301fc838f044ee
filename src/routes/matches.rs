use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{debug, info};

use super::{enforce_limit, resolve_role};
use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::ApiError;
use crate::models::api::MatchPreviewResponse;

/// Match preview routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/match/preview", post(preview_matches))
}

/// POST /api/match/preview - Top counterpart matches with rationale.
async fn preview_matches(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MatchPreviewResponse>, ApiError> {
    let auth = authenticate(&state.settings, &headers)?;
    enforce_limit(
        state.api_limiter.as_ref(),
        &format!("match:{}", auth.user_id),
        "Rate limit",
    )
    .await?;

    let Some(role) = resolve_role(&state, &auth).await? else {
        debug!(user_id = %auth.user_id, "No role chosen yet; returning no matches");
        return Ok(Json(MatchPreviewResponse {
            matches: Vec::new(),
        }));
    };

    let matches = state
        .matcher
        .preview(&auth.user_id, role)
        .await
        .map_err(|e| ApiError::internal("Failed to compute matches", e))?;

    info!(
        user_id = %auth.user_id,
        role = %role,
        matches = matches.len(),
        "Match preview served"
    );
    Ok(Json(MatchPreviewResponse { matches }))
}
