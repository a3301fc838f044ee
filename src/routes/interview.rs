use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::enforce_limit;
use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::ApiError;
use crate::models::api::{InterviewSubmitRequest, OkResponse};
use crate::models::profile::{Embedding, ProfileUpdate, Role, Startup, TechBackground};

const MAX_FIELDS: usize = 50;
const MAX_FIELD_LENGTH: usize = 5000;
const MAX_FREE_TEXT_LENGTH: usize = 10_000;

/// Onboarding interview routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/interview/submit", post(submit_interview))
}

fn validate(req: &InterviewSubmitRequest) -> Result<(), ApiError> {
    if req.structured.len() > MAX_FIELDS {
        return Err(ApiError::BadRequest(
            "Too many fields in structured data".to_string(),
        ));
    }
    if let Some((key, _)) = req
        .structured
        .iter()
        .find(|(_, value)| value.chars().count() > MAX_FIELD_LENGTH)
    {
        return Err(ApiError::BadRequest(format!("Field '{key}' is too long")));
    }
    if req
        .free_text
        .as_deref()
        .is_some_and(|t| t.chars().count() > MAX_FREE_TEXT_LENGTH)
    {
        return Err(ApiError::BadRequest("freeText is too long".to_string()));
    }
    Ok(())
}

/// Answer for `key`, treating blank answers as absent.
fn field(structured: &HashMap<String, String>, key: &str) -> Option<String> {
    structured
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
}

fn startup_from(structured: &HashMap<String, String>) -> Startup {
    Startup {
        stage: field(structured, "stage"),
        domain: field(structured, "domain"),
        description: field(structured, "description"),
        equity_offer: field(structured, "equity_offer"),
        salary_offer: field(structured, "salary_offer"),
    }
}

fn tech_background_from(structured: &HashMap<String, String>) -> TechBackground {
    TechBackground {
        primary_stack: field(structured, "primary_stack"),
        years_experience: field(structured, "years_experience")
            .and_then(|y| y.trim().parse::<i32>().ok()),
        domains: field(structured, "domains"),
        track_record: field(structured, "track_record"),
    }
}

/// POST /api/interview/submit - Store answers, summarize and embed the profile.
async fn submit_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<InterviewSubmitRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let auth = authenticate(&state.settings, &headers)?;
    enforce_limit(
        state.api_limiter.as_ref(),
        &format!("interview:{}", auth.user_id),
        "Rate limit",
    )
    .await?;

    let Json(req) = payload.map_err(|e| {
        warn!(user_id = %auth.user_id, "Rejected interview body: {e}");
        ApiError::BadRequest("Invalid request data".to_string())
    })?;
    validate(&req)?;

    let user_id = auth.user_id.as_str();
    let profiles = &state.profiles;
    let free_text = req.free_text.as_deref();

    profiles
        .record_interview(user_id, req.role, &req.structured, free_text)
        .await
        .map_err(|e| ApiError::internal("Failed to save interview", e))?;

    let name = field(&req.structured, "name");
    let location = field(&req.structured, "location");
    if name.is_some() || location.is_some() {
        let update = ProfileUpdate {
            name,
            location,
            timezone: field(&req.structured, "timezone"),
            availability: field(&req.structured, "availability"),
            commitment: field(&req.structured, "commitment"),
        };
        profiles
            .upsert_profile(user_id, &update)
            .await
            .map_err(|e| ApiError::internal("Failed to save profile", e))?;
    }

    match req.role {
        Role::Ceo => profiles
            .upsert_startup(user_id, &startup_from(&req.structured))
            .await
            .map_err(|e| ApiError::internal("Failed to save startup", e))?,
        Role::Cto => profiles
            .upsert_tech_background(user_id, &tech_background_from(&req.structured))
            .await
            .map_err(|e| ApiError::internal("Failed to save tech background", e))?,
    }

    let summary = state
        .advisor
        .summarize(req.role, &req.structured, free_text)
        .await
        .unwrap_or_else(|e| {
            warn!(user_id, "Profile summary failed, storing empty summary: {e}");
            String::new()
        });
    profiles
        .upsert_summary(user_id, &summary)
        .await
        .map_err(|e| ApiError::internal("Failed to save summary", e))?;

    if summary.trim().is_empty() {
        warn!(user_id, "Empty summary; skipping embedding");
    } else {
        match state.embedding_model.embed(&summary).await {
            Ok(vector) => {
                let embedding = Embedding {
                    owner_id: user_id.to_string(),
                    role: req.role,
                    source: state.settings.match_source.clone(),
                    vector,
                    created_at: Utc::now(),
                };
                state
                    .embedding_store
                    .insert(&embedding)
                    .await
                    .map_err(|e| ApiError::internal("Failed to save embedding", e))?;
            }
            Err(e) => warn!(user_id, "Embedding failed; profile will not be matchable yet: {e}"),
        }
    }

    profiles
        .mark_onboarded(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to update account", e))?;

    info!(user_id, role = %req.role, "Interview submitted");
    Ok(Json(OkResponse { ok: true }))
}
