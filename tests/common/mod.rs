#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use founderfinder::advisor::ProfileAdvisor;
use founderfinder::app::AppState;
use founderfinder::config::{load_settings_from_path, Settings};
use founderfinder::database::memory::MemoryProfileStore;
use founderfinder::database::ProfileStore;
use founderfinder::embedding::EmbeddingModel;
use founderfinder::models::profile::{
    Embedding, IntroRequest, Profile, ProfileSummary, ProfileUpdate, Role, Startup,
    TechBackground, UserAccount,
};
use founderfinder::rate_limit::RateLimiter;
use founderfinder::routes::build_router;
use founderfinder::vector_store::memory::MemoryEmbeddingStore;
use founderfinder::vector_store::EmbeddingStore;

pub const SECRET: &str = "integration-secret";

pub fn settings(api_max_requests: u32) -> Settings {
    let toml = format!(
        r#"
[api]
host = "127.0.0.1"
port = 0

[auth]
jwt_algorithm = "HS256"
bypass_auth_mode = true

[completion]
model = "gpt-4o-mini"

[database]
provider = "memory"

[embedding]
model = "text-embedding-3-small"
dimensions = 3

[rate_limit]
api_max_requests = {api_max_requests}
auth_max_requests = 2
"#
    );
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(toml.as_bytes()).unwrap();
    let mut settings = load_settings_from_path(tmp.path()).unwrap();
    settings.bypass_auth_mode = false;
    settings.jwt_secret_key = SECRET.to_string();
    settings
}

/// Embeds known texts to fixed vectors; anything else fails.
#[derive(Default)]
pub struct TableEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
}

#[async_trait]
impl EmbeddingModel for TableEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no vector for {text:?}"))
    }

    fn dimensions(&self) -> u32 {
        3
    }
}

/// Deterministic advisor; rationale fails when either summary contains "FAIL".
#[derive(Default)]
pub struct FakeAdvisor {
    pub summaries: Mutex<Vec<(Role, HashMap<String, String>)>>,
}

#[async_trait]
impl ProfileAdvisor for FakeAdvisor {
    async fn summarize(
        &self,
        role: Role,
        structured: &HashMap<String, String>,
        _free_text: Option<&str>,
    ) -> anyhow::Result<String> {
        self.summaries.lock().await.push((role, structured.clone()));
        Ok(format!(
            "{role} {}",
            structured.get("name").map(String::as_str).unwrap_or("unknown")
        ))
    }

    async fn rationale(&self, ceo: &str, cto: &str) -> anyhow::Result<String> {
        if ceo.contains("FAIL") || cto.contains("FAIL") {
            anyhow::bail!("completion timed out");
        }
        Ok(format!("- CEO: {ceo}\n- CTO: {cto}"))
    }
}

pub struct Harness {
    pub router: Router,
    pub profiles: Arc<MemoryProfileStore>,
    pub embeddings: Arc<MemoryEmbeddingStore>,
    pub advisor: Arc<FakeAdvisor>,
}

pub fn harness(api_max_requests: u32, embedder: TableEmbedder) -> Harness {
    let profiles = Arc::new(MemoryProfileStore::new());
    let embeddings = Arc::new(MemoryEmbeddingStore::new());
    let advisor = Arc::new(FakeAdvisor::default());
    let state = AppState::new(
        settings(api_max_requests),
        embeddings.clone(),
        profiles.clone(),
        Arc::new(embedder),
        advisor.clone(),
    );
    Harness {
        router: build_router(Arc::new(state)),
        profiles,
        embeddings,
        advisor,
    }
}

/// App state over caller-supplied stores, for wiring in wrappers or other limiters.
pub fn state_over(
    profiles: Arc<dyn ProfileStore>,
    embeddings: Arc<MemoryEmbeddingStore>,
) -> AppState {
    AppState::new(
        settings(60),
        embeddings,
        profiles,
        Arc::new(TableEmbedder::default()),
        Arc::new(FakeAdvisor::default()),
    )
}

/// Limiter whose backend is always unreachable.
pub struct UnreachableLimiter;

#[async_trait]
impl RateLimiter for UnreachableLimiter {
    async fn check(&self, _key: &str) -> anyhow::Result<bool> {
        anyhow::bail!("limiter backend unreachable")
    }
}

/// Memory store with switchable faults.
#[derive(Default)]
pub struct FaultyProfiles {
    pub inner: MemoryProfileStore,
    /// `get_summary` fails for this account.
    pub broken_summary_for: Option<String>,
    /// The next `find_intro_request` misses, as if another request had not committed yet.
    pub stale_intro_lookup: AtomicBool,
}

#[async_trait]
impl ProfileStore for FaultyProfiles {
    async fn create_user(&self, user: &UserAccount) -> anyhow::Result<()> {
        self.inner.create_user(user).await
    }
    async fn get_user(&self, user_id: &str) -> anyhow::Result<Option<UserAccount>> {
        self.inner.get_user(user_id).await
    }
    async fn set_role(&self, user_id: &str, role: Role) -> anyhow::Result<bool> {
        self.inner.set_role(user_id, role).await
    }
    async fn mark_onboarded(&self, user_id: &str) -> anyhow::Result<()> {
        self.inner.mark_onboarded(user_id).await
    }
    async fn record_interview(
        &self,
        user_id: &str,
        role: Role,
        structured: &HashMap<String, String>,
        free_text: Option<&str>,
    ) -> anyhow::Result<()> {
        self.inner
            .record_interview(user_id, role, structured, free_text)
            .await
    }
    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> anyhow::Result<()> {
        self.inner.upsert_profile(user_id, update).await
    }
    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        self.inner.get_profile(user_id).await
    }
    async fn upsert_startup(&self, user_id: &str, startup: &Startup) -> anyhow::Result<()> {
        self.inner.upsert_startup(user_id, startup).await
    }
    async fn get_startup(&self, user_id: &str) -> anyhow::Result<Option<Startup>> {
        self.inner.get_startup(user_id).await
    }
    async fn upsert_tech_background(
        &self,
        user_id: &str,
        tech: &TechBackground,
    ) -> anyhow::Result<()> {
        self.inner.upsert_tech_background(user_id, tech).await
    }
    async fn get_tech_background(&self, user_id: &str) -> anyhow::Result<Option<TechBackground>> {
        self.inner.get_tech_background(user_id).await
    }
    async fn upsert_summary(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        self.inner.upsert_summary(user_id, text).await
    }
    async fn get_summary(&self, user_id: &str) -> anyhow::Result<Option<ProfileSummary>> {
        if self.broken_summary_for.as_deref() == Some(user_id) {
            anyhow::bail!("summary table unavailable");
        }
        self.inner.get_summary(user_id).await
    }
    async fn create_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
        feedback: Option<&str>,
        rating: Option<i32>,
    ) -> anyhow::Result<IntroRequest> {
        self.inner
            .create_intro_request(requester_id, target_id, feedback, rating)
            .await
    }
    async fn find_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<IntroRequest>> {
        if self.stale_intro_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_intro_request(requester_id, target_id).await
    }
    async fn list_intro_requests(&self, user_id: &str) -> anyhow::Result<Vec<IntroRequest>> {
        self.inner.list_intro_requests(user_id).await
    }
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn token(user_id: &str, role: Option<Role>) -> String {
    let exp = (Utc::now() + Duration::hours(1)).timestamp();
    encode(
        &Header::default(),
        &json!({ "user_id": user_id, "role": role, "exp": exp }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn post(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(t) = bearer {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(t) = bearer {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn seed_user(profiles: &MemoryProfileStore, id: &str, role: Option<Role>) {
    profiles
        .create_user(&UserAccount {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: None,
            role,
            onboarded: true,
        })
        .await
        .unwrap();
}

pub async fn seed_embedding(embeddings: &MemoryEmbeddingStore, id: &str, role: Role, vector: Vec<f32>) {
    embeddings
        .insert(&Embedding {
            owner_id: id.to_string(),
            role,
            source: "summary".to_string(),
            vector,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
}
