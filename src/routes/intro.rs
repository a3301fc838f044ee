use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::enforce_limit;
use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::ApiError;
use crate::models::api::{
    IntroConflictResponse, IntroCreatedResponse, IntroListResponse, IntroParty, IntroRequestBody,
    IntroRequestSummary, IntroRequestView,
};
use crate::models::profile::IntroRequest;

/// Introduction request routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/intro/request", post(create_request).get(list_requests))
}

/// POST /api/intro/request - Ask to be introduced to a match.
async fn create_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<IntroRequestBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let auth = authenticate(&state.settings, &headers)?;
    let user_id = auth.user_id.as_str();
    enforce_limit(
        state.api_limiter.as_ref(),
        &format!("intro:{user_id}"),
        "Rate limit exceeded",
    )
    .await?;

    let Json(body) =
        payload.map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;
    let target_id = body
        .target_id
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("targetId is required".to_string()))?;

    let target = state
        .profiles
        .get_user(&target_id)
        .await
        .map_err(|e| ApiError::internal("Failed to create intro request", e))?;
    if target.is_none() {
        return Err(ApiError::NotFound("Target user not found".to_string()));
    }
    if target_id == user_id {
        return Err(ApiError::BadRequest(
            "Cannot request intro to yourself".to_string(),
        ));
    }

    let existing = state
        .profiles
        .find_intro_request(user_id, &target_id)
        .await
        .map_err(|e| ApiError::internal("Failed to create intro request", e))?;
    if let Some(existing) = existing {
        return Ok(conflict(&existing));
    }

    let feedback = body.feedback.as_deref().filter(|f| !f.is_empty());
    let rating = body.rating.filter(|r| *r != 0);
    let request = match state
        .profiles
        .create_intro_request(user_id, &target_id, feedback, rating)
        .await
    {
        Ok(request) => request,
        Err(e) => {
            // A concurrent request for the same pair may have won the insert.
            let winner = state
                .profiles
                .find_intro_request(user_id, &target_id)
                .await
                .map_err(|e| ApiError::internal("Failed to create intro request", e))?;
            return match winner {
                Some(existing) => Ok(conflict(&existing)),
                None => Err(ApiError::internal("Failed to create intro request", e)),
            };
        }
    };

    info!(
        request_id = %request.id,
        requester_id = user_id,
        target_id = %target_id,
        "Intro request created"
    );
    Ok(Json(IntroCreatedResponse {
        success: true,
        request: IntroRequestSummary::from(&request),
    })
    .into_response())
}

fn conflict(existing: &IntroRequest) -> Response {
    let body = IntroConflictResponse {
        error: "Request already exists".to_string(),
        request: IntroRequestSummary::from(existing),
    };
    (StatusCode::CONFLICT, Json(body)).into_response()
}

/// GET /api/intro/request - Requests sent or received by the caller, newest first.
async fn list_requests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<IntroListResponse>, ApiError> {
    let auth = authenticate(&state.settings, &headers)?;
    let requests = state
        .profiles
        .list_intro_requests(&auth.user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch intro requests", e))?;

    let mut parties: HashMap<String, Option<IntroParty>> = HashMap::new();
    let mut views = Vec::with_capacity(requests.len());
    for request in requests {
        let requester = party(&state, &mut parties, &request.requester_id).await?;
        let target = party(&state, &mut parties, &request.target_id).await?;
        views.push(IntroRequestView {
            request,
            requester,
            target,
        });
    }

    Ok(Json(IntroListResponse { requests: views }))
}

async fn party(
    state: &AppState,
    cache: &mut HashMap<String, Option<IntroParty>>,
    user_id: &str,
) -> Result<Option<IntroParty>, ApiError> {
    if let Some(cached) = cache.get(user_id) {
        return Ok(cached.clone());
    }
    let account = state
        .profiles
        .get_user(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch intro requests", e))?;
    let party = account.map(|a| IntroParty {
        id: a.id,
        name: a.name,
        email: a.email,
        role: a.role,
    });
    cache.insert(user_id.to_string(), party.clone());
    Ok(party)
}
