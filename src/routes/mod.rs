pub mod analytics;
pub mod health;
pub mod intro;
pub mod interview;
pub mod matches;
pub mod user;

use axum::Router;
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::api::AuthContext;
use crate::models::profile::Role;
use crate::rate_limit::RateLimiter;

/// Build all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(matches::routes())
        .merge(interview::routes())
        .merge(user::routes())
        .merge(intro::routes())
        .merge(analytics::routes())
        .with_state(state)
}

/// Reject with 429 when `key` is over its limit. A failing limiter admits the request.
pub(crate) async fn enforce_limit(
    limiter: &dyn RateLimiter,
    key: &str,
    message: &str,
) -> Result<(), ApiError> {
    match limiter.check(key).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiError::RateLimited(message.to_string())),
        Err(e) => {
            warn!(key, "Rate limiter unavailable, admitting request: {e}");
            Ok(())
        }
    }
}

/// Role from the token, else the role stored on the account.
pub(crate) async fn resolve_role(
    state: &AppState,
    auth: &AuthContext,
) -> Result<Option<Role>, ApiError> {
    if auth.role.is_some() {
        return Ok(auth.role);
    }
    let account = state
        .profiles
        .get_user(&auth.user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load account", e))?;
    Ok(account.and_then(|a| a.role))
}
