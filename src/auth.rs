use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::ApiError;
use crate::models::api::AuthContext;
use crate::models::profile::Role;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub user_id: Option<String>,
    /// Backward-compat: subject claim.
    pub sub: Option<String>,
    /// Role chosen during onboarding, absent before the role step.
    #[serde(default)]
    pub role: Option<Role>,
    /// Expiration time (Unix timestamp).
    pub exp: Option<u64>,
}

/// Verify a JWT token and extract auth context.
pub fn verify_token(token: &str, secret: &str, algorithm: &str) -> Result<AuthContext, String> {
    let algo = match algorithm {
        "HS256" => jsonwebtoken::Algorithm::HS256,
        "HS384" => jsonwebtoken::Algorithm::HS384,
        "HS512" => jsonwebtoken::Algorithm::HS512,
        _ => return Err(format!("Unsupported algorithm: {algorithm}")),
    };

    let mut validation = Validation::new(algo);
    // Allow some clock drift.
    validation.leeway = 60;
    validation.required_spec_claims = std::collections::HashSet::new();

    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| format!("Token validation failed: {e}"))?;

    let claims = token_data.claims;
    let user_id = claims
        .user_id
        .or(claims.sub)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| "Token carries no user id".to_string())?;

    Ok(AuthContext {
        user_id,
        role: claims.role,
    })
}

/// Extract auth context from an Authorization header.
pub fn extract_auth_from_header(
    auth_header: Option<&str>,
    secret: &str,
    algorithm: &str,
    bypass_mode: bool,
    dev_user_id: &str,
    dev_user_role: Option<Role>,
) -> Result<AuthContext, ApiError> {
    if bypass_mode {
        return Ok(AuthContext {
            user_id: dev_user_id.to_string(),
            role: dev_user_role,
        });
    }

    let header = auth_header.ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

    verify_token(token, secret, algorithm).map_err(|e| {
        tracing::debug!("Rejected bearer token: {e}");
        ApiError::Unauthorized("Unauthorized".to_string())
    })
}

/// Authenticate a request against the configured auth settings.
pub fn authenticate(settings: &Settings, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    extract_auth_from_header(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        &settings.jwt_secret_key,
        &settings.jwt_algorithm,
        settings.bypass_auth_mode,
        &settings.dev_user_id,
        settings.dev_user_role,
    )
}
