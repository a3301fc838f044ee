use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::models::profile::Role;

/// Global settings singleton.
static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Default config file read by the binary.
pub const CONFIG_FILE: &str = "founderfinder.toml";

// ──────────────────────────── TOML structure ────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct TomlConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub registered_models: HashMap<String, HashMap<String, toml::Value>>,
    pub completion: CompletionConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_environment() -> String {
    "development".to_string()
}
fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_algorithm: String,
    #[serde(default)]
    pub bypass_auth_mode: bool,
    #[serde(default = "default_dev_user_id")]
    pub dev_user_id: String,
    #[serde(default)]
    pub dev_user_role: Option<Role>,
}

fn default_dev_user_id() -> String {
    "dev_user".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
}

fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f64 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub provider: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_rank_limit")]
    pub rank_limit: usize,
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            rank_limit: default_rank_limit(),
            preview_limit: default_preview_limit(),
            enrich_concurrency: default_enrich_concurrency(),
            source: default_source(),
        }
    }
}

fn default_rank_limit() -> usize {
    20
}
fn default_preview_limit() -> usize {
    5
}
fn default_enrich_concurrency() -> usize {
    5
}
fn default_source() -> String {
    "summary".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_max_requests")]
    pub api_max_requests: u32,
    #[serde(default = "default_auth_max_requests")]
    pub auth_max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_max_requests: default_api_max_requests(),
            auth_max_requests: default_auth_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_api_max_requests() -> u32 {
    60
}
fn default_auth_max_requests() -> u32 {
    5
}
fn default_window_secs() -> u64 {
    600
}

// ──────────────────────────── Resolved Settings ────────────────────────────

/// Flat settings structure resolved from TOML + environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    // API
    pub host: String,
    pub port: u16,

    // Service
    pub environment: String,
    pub version: String,

    // Auth
    pub jwt_algorithm: String,
    pub jwt_secret_key: String,
    pub bypass_auth_mode: bool,
    pub dev_user_id: String,
    pub dev_user_role: Option<Role>,

    // Registered models
    pub registered_models: HashMap<String, HashMap<String, toml::Value>>,

    // Completion
    pub completion_model: String,
    pub default_max_tokens: u32,
    pub default_temperature: f64,

    // Database
    pub database_provider: String,
    pub postgres_uri: Option<String>,
    pub db_pool_size: u32,

    // Embedding
    pub embedding_model: String,
    pub vector_dimensions: u32,

    // AI provider
    pub openai_api_key: String,

    // Matching
    pub rank_limit: usize,
    pub preview_limit: usize,
    pub enrich_concurrency: usize,
    pub match_source: String,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub api_max_requests: u32,
    pub auth_max_requests: u32,
    pub rate_limit_window_secs: u64,
}

impl Settings {
    /// Resolve a model name from the registered_models table.
    pub fn resolve_model_name(&self, key: &str) -> Option<String> {
        self.registered_models
            .get(key)
            .and_then(|m| m.get("model_name"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Load and cache settings from founderfinder.toml and env.
pub fn get_settings() -> anyhow::Result<&'static Settings> {
    if let Some(settings) = SETTINGS.get() {
        return Ok(settings);
    }
    let settings = load_settings_from_path(CONFIG_FILE)?;
    Ok(SETTINGS.get_or_init(|| settings))
}

/// Load settings from a given TOML path. Useful for testing.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
    // Load .env if present (ignore errors)
    let _ = dotenvy::dotenv();

    let content = std::fs::read_to_string(path.as_ref())?;
    let config: TomlConfig = toml::from_str(&content)?;

    let jwt_secret_key =
        std::env::var("JWT_SECRET_KEY").unwrap_or_else(|_| "dev-secret-key".to_string());

    if !config.auth.bypass_auth_mode && jwt_secret_key == "dev-secret-key" {
        anyhow::bail!("JWT_SECRET_KEY is required when bypass_auth_mode is disabled");
    }

    let postgres_uri = match config.database.provider.as_str() {
        "postgres" => Some(std::env::var("POSTGRES_URI").map_err(|_| {
            anyhow::anyhow!("POSTGRES_URI environment variable is required for postgres provider")
        })?),
        "memory" => std::env::var("POSTGRES_URI").ok(),
        other => anyhow::bail!("Unknown database provider: {other}"),
    };

    if config.matching.rank_limit == 0 {
        anyhow::bail!("matching.rank_limit must be at least 1");
    }

    let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

    Ok(Settings {
        host: config.api.host,
        port: config.api.port,
        environment: config.service.environment,
        version: config.service.version,
        jwt_algorithm: config.auth.jwt_algorithm,
        jwt_secret_key,
        bypass_auth_mode: config.auth.bypass_auth_mode,
        dev_user_id: config.auth.dev_user_id,
        dev_user_role: config.auth.dev_user_role,
        registered_models: config.registered_models,
        completion_model: config.completion.model,
        default_max_tokens: config.completion.default_max_tokens,
        default_temperature: config.completion.default_temperature,
        database_provider: config.database.provider,
        postgres_uri,
        db_pool_size: config.database.pool_size,
        embedding_model: config.embedding.model,
        vector_dimensions: config.embedding.dimensions,
        openai_api_key,
        rank_limit: config.matching.rank_limit,
        preview_limit: config.matching.preview_limit,
        enrich_concurrency: config.matching.enrich_concurrency.max(1),
        match_source: config.matching.source,
        rate_limit_enabled: config.rate_limit.enabled,
        api_max_requests: config.rate_limit.api_max_requests,
        auth_max_requests: config.rate_limit.auth_max_requests,
        rate_limit_window_secs: config.rate_limit.window_secs,
    })
}
