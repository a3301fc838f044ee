use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use super::enforce_limit;
use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::ApiError;
use crate::models::api::{OkResponse, RoleUpdateRequest};
use crate::models::profile::Role;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/user/role", post(set_role))
}

/// POST /api/user/role - Choose CEO or CTO.
async fn set_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RoleUpdateRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let auth = authenticate(&state.settings, &headers)?;
    enforce_limit(
        state.auth_limiter.as_ref(),
        &format!("role:{}", auth.user_id),
        "Rate limit",
    )
    .await?;

    let role: Role = payload
        .ok()
        .and_then(|Json(body)| body.role)
        .and_then(|r| r.parse().ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid role".to_string()))?;

    let updated = state
        .profiles
        .set_role(&auth.user_id, role)
        .await
        .map_err(|e| ApiError::internal("Failed to update role", e))?;
    if !updated {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id = %auth.user_id, role = %role, "Role updated");
    Ok(Json(OkResponse { ok: true }))
}
