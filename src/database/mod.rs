pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::profile::{
    IntroRequest, Profile, ProfileSummary, ProfileUpdate, Role, Startup, TechBackground,
    UserAccount,
};

/// Abstract persistence interface for accounts, interview data and intro requests.
///
/// Upserts are partial: a `None` field never overwrites a stored value.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert an account. Used by seeding and tests; sign-up lives in the identity layer.
    async fn create_user(&self, user: &UserAccount) -> anyhow::Result<()>;

    async fn get_user(&self, user_id: &str) -> anyhow::Result<Option<UserAccount>>;

    /// Set the account role. Returns false when the account does not exist.
    async fn set_role(&self, user_id: &str, role: Role) -> anyhow::Result<bool>;

    /// No-op for unknown accounts.
    async fn mark_onboarded(&self, user_id: &str) -> anyhow::Result<()>;

    /// Append a raw interview submission.
    async fn record_interview(
        &self,
        user_id: &str,
        role: Role,
        structured: &HashMap<String, String>,
        free_text: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> anyhow::Result<()>;

    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;

    async fn upsert_startup(&self, user_id: &str, startup: &Startup) -> anyhow::Result<()>;

    async fn get_startup(&self, user_id: &str) -> anyhow::Result<Option<Startup>>;

    async fn upsert_tech_background(
        &self,
        user_id: &str,
        tech: &TechBackground,
    ) -> anyhow::Result<()>;

    async fn get_tech_background(&self, user_id: &str) -> anyhow::Result<Option<TechBackground>>;

    async fn upsert_summary(&self, user_id: &str, text: &str) -> anyhow::Result<()>;

    async fn get_summary(&self, user_id: &str) -> anyhow::Result<Option<ProfileSummary>>;

    async fn create_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
        feedback: Option<&str>,
        rating: Option<i32>,
    ) -> anyhow::Result<IntroRequest>;

    async fn find_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<IntroRequest>>;

    /// Requests where the user is requester or target, newest first.
    async fn list_intro_requests(&self, user_id: &str) -> anyhow::Result<Vec<IntroRequest>>;

    /// Initialize database tables.
    async fn initialize(&self) -> anyhow::Result<()>;
}
