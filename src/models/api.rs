use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::profile::{EnrichedMatch, IntroRequest, IntroStatus, Role};

// ──────────────────────────── Matches ────────────────────────────

#[derive(Debug, Serialize)]
pub struct MatchPreviewResponse {
    pub matches: Vec<EnrichedMatch>,
}

// ──────────────────────────── Interview ────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSubmitRequest {
    pub role: Role,
    /// Free-form answers keyed by question name.
    #[serde(default)]
    pub structured: HashMap<String, String>,
    #[serde(default)]
    pub free_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ──────────────────────────── User ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    /// Kept as a raw string so an unknown role is a 400, not a body rejection.
    #[serde(default)]
    pub role: Option<String>,
}

// ──────────────────────────── Intro requests ────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroRequestBody {
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroRequestSummary {
    pub id: String,
    pub status: IntroStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&IntroRequest> for IntroRequestSummary {
    fn from(req: &IntroRequest) -> Self {
        Self {
            id: req.id.clone(),
            status: req.status,
            created_at: req.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IntroCreatedResponse {
    pub success: bool,
    pub request: IntroRequestSummary,
}

#[derive(Debug, Serialize)]
pub struct IntroConflictResponse {
    pub error: String,
    pub request: IntroRequestSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntroParty {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct IntroRequestView {
    #[serde(flatten)]
    pub request: IntroRequest,
    pub requester: Option<IntroParty>,
    pub target: Option<IntroParty>,
}

#[derive(Debug, Serialize)]
pub struct IntroListResponse {
    pub requests: Vec<IntroRequestView>,
}

// ──────────────────────────── Analytics ────────────────────────────

/// Client-side product events forwarded to the server log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    PageView {
        path: String,
    },
    CtaClick {
        cta: String,
        #[serde(default)]
        role: Option<Role>,
    },
    SignupStart {
        #[serde(default)]
        role: Option<Role>,
    },
    OnboardingStep {
        step: String,
    },
    MatchView {
        #[serde(default, rename = "matchId")]
        match_id: Option<String>,
    },
    IntroRequest {
        #[serde(default, rename = "matchId")]
        match_id: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ──────────────────────────── Auth ────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<Role>,
}

// ──────────────────────────── Health ────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
