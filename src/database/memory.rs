use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ProfileStore;
use crate::models::profile::{
    IntroRequest, IntroStatus, Profile, ProfileSummary, ProfileUpdate, Role, Startup,
    TechBackground, UserAccount,
};

#[derive(Debug, Clone)]
pub struct InterviewRecord {
    pub user_id: String,
    pub role: Role,
    pub structured: HashMap<String, String>,
    pub free_text: Option<String>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserAccount>,
    profiles: HashMap<String, Profile>,
    startups: HashMap<String, Startup>,
    tech_backgrounds: HashMap<String, TechBackground>,
    summaries: HashMap<String, String>,
    interviews: Vec<InterviewRecord>,
    intro_requests: Vec<IntroRequest>,
}

/// In-process profile store for development and tests.
#[derive(Default)]
pub struct MemoryProfileStore {
    tables: RwLock<Tables>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn interviews(&self) -> Vec<InterviewRecord> {
        self.tables.read().await.interviews.clone()
    }
}

fn merge(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn create_user(&self, user: &UserAccount) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            anyhow::bail!("User {} already exists", user.id);
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> anyhow::Result<Option<UserAccount>> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn set_role(&self, user_id: &str, role: Role) -> anyhow::Result<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(user_id) {
            Some(user) => {
                user.role = Some(role);
                true
            }
            None => false,
        })
    }

    async fn mark_onboarded(&self, user_id: &str) -> anyhow::Result<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(user_id) {
            user.onboarded = true;
        }
        Ok(())
    }

    async fn record_interview(
        &self,
        user_id: &str,
        role: Role,
        structured: &HashMap<String, String>,
        free_text: Option<&str>,
    ) -> anyhow::Result<()> {
        self.tables.write().await.interviews.push(InterviewRecord {
            user_id: user_id.to_string(),
            role,
            structured: structured.clone(),
            free_text: free_text.map(str::to_string),
        });
        Ok(())
    }

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        if let Some(name) = &update.name {
            profile.name.clone_from(name);
        }
        merge(&mut profile.location, &update.location);
        merge(&mut profile.timezone, &update.timezone);
        merge(&mut profile.availability, &update.availability);
        merge(&mut profile.commitment, &update.commitment);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn upsert_startup(&self, user_id: &str, startup: &Startup) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.startups.entry(user_id.to_string()).or_default();
        merge(&mut stored.stage, &startup.stage);
        merge(&mut stored.domain, &startup.domain);
        merge(&mut stored.description, &startup.description);
        merge(&mut stored.equity_offer, &startup.equity_offer);
        merge(&mut stored.salary_offer, &startup.salary_offer);
        Ok(())
    }

    async fn get_startup(&self, user_id: &str) -> anyhow::Result<Option<Startup>> {
        Ok(self.tables.read().await.startups.get(user_id).cloned())
    }

    async fn upsert_tech_background(
        &self,
        user_id: &str,
        tech: &TechBackground,
    ) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables.tech_backgrounds.entry(user_id.to_string()).or_default();
        merge(&mut stored.primary_stack, &tech.primary_stack);
        if tech.years_experience.is_some() {
            stored.years_experience = tech.years_experience;
        }
        merge(&mut stored.domains, &tech.domains);
        merge(&mut stored.track_record, &tech.track_record);
        Ok(())
    }

    async fn get_tech_background(&self, user_id: &str) -> anyhow::Result<Option<TechBackground>> {
        Ok(self.tables.read().await.tech_backgrounds.get(user_id).cloned())
    }

    async fn upsert_summary(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        self.tables
            .write()
            .await
            .summaries
            .insert(user_id.to_string(), text.to_string());
        Ok(())
    }

    async fn get_summary(&self, user_id: &str) -> anyhow::Result<Option<ProfileSummary>> {
        Ok(self
            .tables
            .read()
            .await
            .summaries
            .get(user_id)
            .map(|text| ProfileSummary {
                user_id: user_id.to_string(),
                text: text.clone(),
            }))
    }

    async fn create_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
        feedback: Option<&str>,
        rating: Option<i32>,
    ) -> anyhow::Result<IntroRequest> {
        let mut tables = self.tables.write().await;
        if tables
            .intro_requests
            .iter()
            .any(|r| r.requester_id == requester_id && r.target_id == target_id)
        {
            anyhow::bail!("Intro request {requester_id} -> {target_id} already exists");
        }
        let request = IntroRequest {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id: requester_id.to_string(),
            target_id: target_id.to_string(),
            status: IntroStatus::Pending,
            feedback: feedback.map(str::to_string),
            rating,
            created_at: Utc::now(),
        };
        tables.intro_requests.push(request.clone());
        Ok(request)
    }

    async fn find_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<IntroRequest>> {
        Ok(self
            .tables
            .read()
            .await
            .intro_requests
            .iter()
            .find(|r| r.requester_id == requester_id && r.target_id == target_id)
            .cloned())
    }

    async fn list_intro_requests(&self, user_id: &str) -> anyhow::Result<Vec<IntroRequest>> {
        let tables = self.tables.read().await;
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut requests: Vec<IntroRequest> = tables
            .intro_requests
            .iter()
            .rev()
            .filter(|r| r.requester_id == user_id || r.target_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
