use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::warn;

use super::MatchError;
use crate::advisor::ProfileAdvisor;
use crate::database::ProfileStore;
use crate::models::profile::{Candidate, EnrichedMatch, Role, RoleDetail};

const ANONYMOUS: &str = "Anonymous";

/// Attaches rationale and display fields to the head of a ranked list.
pub struct MatchEnricher {
    profiles: Arc<dyn ProfileStore>,
    advisor: Arc<dyn ProfileAdvisor>,
    preview_limit: usize,
    concurrency: usize,
}

/// Display fields gathered for one candidate.
struct CandidateCard {
    name: String,
    location: Option<String>,
    timezone: Option<String>,
    availability: Option<String>,
    commitment: Option<String>,
    detail: Option<RoleDetail>,
}

impl MatchEnricher {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        advisor: Arc<dyn ProfileAdvisor>,
        preview_limit: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            profiles,
            advisor,
            preview_limit,
            concurrency: concurrency.max(1),
        }
    }

    /// Enrich at most `preview_limit` candidates, preserving rank order.
    ///
    /// Per-candidate failures degrade to empty or missing fields. Only a failed
    /// lookup of the requester's own summary aborts the batch.
    pub async fn enrich(
        &self,
        requester_id: &str,
        requester_role: Role,
        candidates: &[Candidate],
    ) -> Result<Vec<EnrichedMatch>, MatchError> {
        let head = &candidates[..candidates.len().min(self.preview_limit)];
        if head.is_empty() {
            return Ok(Vec::new());
        }

        let requester_summary = self
            .profiles
            .get_summary(requester_id)
            .await
            .map_err(MatchError::RequesterSummary)?
            .map(|s| s.text)
            .unwrap_or_default();

        let candidate_role = requester_role.counterpart();
        // Built up front so the handler future stays Send for any lifetime.
        let jobs: Vec<BoxFuture<'_, EnrichedMatch>> = head
            .iter()
            .map(|candidate| {
                self.enrich_one(requester_id, &requester_summary, candidate_role, candidate)
                    .boxed()
            })
            .collect();
        let enriched: Vec<EnrichedMatch> = stream::iter(jobs)
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(enriched)
    }

    async fn enrich_one(
        &self,
        requester_id: &str,
        requester_summary: &str,
        candidate_role: Role,
        candidate: &Candidate,
    ) -> EnrichedMatch {
        let (rationale, card) = tokio::join!(
            self.rationale_for(requester_id, requester_summary, candidate_role, candidate),
            self.card_for(candidate_role, &candidate.user_id),
        );

        EnrichedMatch {
            user_id: candidate.user_id.clone(),
            score: candidate.score,
            rationale,
            name: card.name,
            location: card.location,
            timezone: card.timezone,
            availability: card.availability,
            commitment: card.commitment,
            detail: card.detail,
        }
    }

    async fn rationale_for(
        &self,
        requester_id: &str,
        requester_summary: &str,
        candidate_role: Role,
        candidate: &Candidate,
    ) -> String {
        let candidate_summary = match self.profiles.get_summary(&candidate.user_id).await {
            Ok(summary) => summary.map(|s| s.text).unwrap_or_default(),
            Err(e) => {
                warn!(
                    user_id = requester_id,
                    candidate_id = %candidate.user_id,
                    "Candidate summary lookup failed: {e}"
                );
                String::new()
            }
        };

        // The prompt is always phrased CEO first.
        let (ceo, cto) = match candidate_role {
            Role::Cto => (requester_summary, candidate_summary.as_str()),
            Role::Ceo => (candidate_summary.as_str(), requester_summary),
        };

        match self.advisor.rationale(ceo, cto).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    user_id = requester_id,
                    candidate_id = %candidate.user_id,
                    "Rationale generation failed: {e}"
                );
                String::new()
            }
        }
    }

    async fn card_for(&self, candidate_role: Role, user_id: &str) -> CandidateCard {
        let (profile, account, detail) = tokio::join!(
            self.profiles.get_profile(user_id),
            self.profiles.get_user(user_id),
            self.detail_for(candidate_role, user_id),
        );
        let profile = profile.unwrap_or_else(|e| {
            warn!(candidate_id = user_id, "Profile lookup failed: {e}");
            None
        });
        let account = account.unwrap_or_else(|e| {
            warn!(candidate_id = user_id, "Account lookup failed: {e}");
            None
        });

        let name = profile
            .as_ref()
            .map(|p| p.name.trim())
            .filter(|n| !n.is_empty())
            .or_else(|| {
                account
                    .as_ref()
                    .and_then(|a| a.name.as_deref())
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or(ANONYMOUS)
            .to_string();

        let profile = profile.unwrap_or_default();
        CandidateCard {
            name,
            location: profile.location,
            timezone: profile.timezone,
            availability: profile.availability,
            commitment: profile.commitment,
            detail,
        }
    }

    /// Startup details for CEOs, technical background for CTOs. Never both.
    async fn detail_for(&self, candidate_role: Role, user_id: &str) -> Option<RoleDetail> {
        let detail = match candidate_role {
            Role::Ceo => self
                .profiles
                .get_startup(user_id)
                .await
                .map(|s| s.map(RoleDetail::Startup)),
            Role::Cto => self
                .profiles
                .get_tech_background(user_id)
                .await
                .map(|t| t.map(RoleDetail::TechBackground)),
        };
        detail.unwrap_or_else(|e| {
            warn!(candidate_id = user_id, "{candidate_role} detail lookup failed: {e}");
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryProfileStore;
    use crate::models::profile::{
        IntroRequest, Profile, ProfileSummary, ProfileUpdate, Startup, TechBackground,
        UserAccount,
    };
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use tokio::sync::Mutex;

    /// Scripted advisor: fails for configured CTO summaries, records calls.
    #[derive(Default)]
    struct ScriptedAdvisor {
        fail_for: HashSet<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ProfileAdvisor for ScriptedAdvisor {
        async fn summarize(
            &self,
            _role: Role,
            _structured: &HashMap<String, String>,
            _free_text: Option<&str>,
        ) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn rationale(&self, ceo: &str, cto: &str) -> anyhow::Result<String> {
            self.calls
                .lock()
                .await
                .push((ceo.to_string(), cto.to_string()));
            if self.fail_for.contains(cto) || self.fail_for.contains(ceo) {
                anyhow::bail!("rate limited upstream");
            }
            Ok(format!("{ceo} + {cto}"))
        }
    }

    fn candidate(id: &str, score: f32) -> Candidate {
        Candidate {
            user_id: id.to_string(),
            score,
        }
    }

    async fn store_with_ctos(n: usize) -> Arc<MemoryProfileStore> {
        let store = Arc::new(MemoryProfileStore::new());
        store.upsert_summary("ceo", "ceo summary").await.unwrap();
        for i in 0..n {
            let id = format!("cto{i}");
            store.upsert_summary(&id, &format!("{id} summary")).await.unwrap();
            store
                .upsert_tech_background(
                    &id,
                    &TechBackground {
                        primary_stack: Some("Rust".to_string()),
                        years_experience: Some(i as i32),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        store
    }

    fn enricher(store: Arc<MemoryProfileStore>, advisor: Arc<ScriptedAdvisor>) -> MatchEnricher {
        MatchEnricher::new(store, advisor, 5, 5)
    }

    #[tokio::test]
    async fn processes_only_preview_limit() {
        let store = store_with_ctos(10).await;
        let advisor = Arc::new(ScriptedAdvisor::default());
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(&format!("cto{i}"), 1.0 - i as f32 * 0.05))
            .collect();

        let enriched = enricher(store, advisor.clone())
            .enrich("ceo", Role::Ceo, &candidates)
            .await
            .unwrap();

        assert_eq!(enriched.len(), 5);
        let ids: Vec<&str> = enriched.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["cto0", "cto1", "cto2", "cto3", "cto4"]);
        assert_eq!(advisor.calls.lock().await.len(), 5);
    }

    #[tokio::test]
    async fn rationale_failure_is_isolated() {
        let store = store_with_ctos(3).await;
        let advisor = Arc::new(ScriptedAdvisor {
            fail_for: HashSet::from(["cto1 summary".to_string()]),
            ..Default::default()
        });
        let candidates = vec![
            candidate("cto0", 0.9),
            candidate("cto1", 0.8),
            candidate("cto2", 0.7),
        ];

        let enriched = enricher(store, advisor)
            .enrich("ceo", Role::Ceo, &candidates)
            .await
            .unwrap();

        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].rationale, "ceo summary + cto0 summary");
        assert_eq!(enriched[1].rationale, "");
        assert_eq!(enriched[1].user_id, "cto1");
        assert_eq!(enriched[2].rationale, "ceo summary + cto2 summary");
    }

    #[tokio::test]
    async fn cto_candidates_carry_only_tech_background() {
        let store = store_with_ctos(1).await;
        // Stray startup row for a CTO must not leak into the match.
        store
            .upsert_startup(
                "cto0",
                &Startup {
                    stage: Some("seed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let enriched = enricher(store, Arc::new(ScriptedAdvisor::default()))
            .enrich("ceo", Role::Ceo, &[candidate("cto0", 0.9)])
            .await
            .unwrap();

        assert!(enriched[0].startup().is_none());
        let tech = enriched[0].tech_background().unwrap();
        assert_eq!(tech.primary_stack.as_deref(), Some("Rust"));
    }

    #[tokio::test]
    async fn ceo_candidates_carry_only_startup_and_prompt_is_ceo_first() {
        let store = Arc::new(MemoryProfileStore::new());
        store.upsert_summary("cto", "cto summary").await.unwrap();
        store.upsert_summary("ceo", "ceo summary").await.unwrap();
        store
            .upsert_startup(
                "ceo",
                &Startup {
                    domain: Some("health".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .upsert_tech_background("ceo", &TechBackground::default())
            .await
            .unwrap();
        let advisor = Arc::new(ScriptedAdvisor::default());

        let enriched = enricher(store, advisor.clone())
            .enrich("cto", Role::Cto, &[candidate("ceo", 0.9)])
            .await
            .unwrap();

        assert!(enriched[0].tech_background().is_none());
        assert_eq!(
            enriched[0].startup().and_then(|s| s.domain.as_deref()),
            Some("health")
        );
        assert_eq!(enriched[0].rationale, "ceo summary + cto summary");
        assert_eq!(
            advisor.calls.lock().await[0],
            ("ceo summary".to_string(), "cto summary".to_string())
        );
    }

    #[tokio::test]
    async fn name_falls_back_to_account_then_anonymous() {
        let store = store_with_ctos(3).await;
        store
            .upsert_profile(
                "cto0",
                &ProfileUpdate {
                    name: Some("Alex Kumar".to_string()),
                    location: Some("Berlin".to_string()),
                    timezone: Some("CET".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .create_user(&UserAccount {
                id: "cto1".to_string(),
                email: "james@example.com".to_string(),
                name: Some("James Wilson".to_string()),
                role: Some(Role::Cto),
                onboarded: true,
            })
            .await
            .unwrap();
        // Profile exists but with an empty name: account name wins.
        store
            .upsert_profile(
                "cto1",
                &ProfileUpdate {
                    location: Some("Austin".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let candidates = vec![
            candidate("cto0", 0.9),
            candidate("cto1", 0.8),
            candidate("cto2", 0.7),
        ];
        let enriched = enricher(store, Arc::new(ScriptedAdvisor::default()))
            .enrich("ceo", Role::Ceo, &candidates)
            .await
            .unwrap();

        assert_eq!(enriched[0].name, "Alex Kumar");
        assert_eq!(enriched[0].location.as_deref(), Some("Berlin"));
        assert_eq!(enriched[0].timezone.as_deref(), Some("CET"));
        assert_eq!(enriched[1].name, "James Wilson");
        assert_eq!(enriched[1].location.as_deref(), Some("Austin"));
        assert_eq!(enriched[2].name, "Anonymous");
        assert!(enriched[2].location.is_none());
    }

    #[tokio::test]
    async fn missing_summaries_degrade_to_empty_text() {
        let store = Arc::new(MemoryProfileStore::new());
        let advisor = Arc::new(ScriptedAdvisor::default());

        let enriched = enricher(store, advisor.clone())
            .enrich("ceo", Role::Ceo, &[candidate("ghost", 0.4)])
            .await
            .unwrap();

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].name, "Anonymous");
        assert!(enriched[0].detail.is_none());
        assert_eq!(advisor.calls.lock().await[0], (String::new(), String::new()));
    }

    #[tokio::test]
    async fn empty_candidate_list_skips_all_work() {
        let advisor = Arc::new(ScriptedAdvisor::default());
        let enriched = enricher(Arc::new(MemoryProfileStore::new()), advisor.clone())
            .enrich("ceo", Role::Ceo, &[])
            .await
            .unwrap();
        assert!(enriched.is_empty());
        assert!(advisor.calls.lock().await.is_empty());
    }

    /// Memory store whose summary lookups fail for one account.
    struct SummaryOutage {
        inner: MemoryProfileStore,
        broken_for: String,
    }

    #[async_trait]
    impl ProfileStore for SummaryOutage {
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
        async fn get_tech_background(
            &self,
            user_id: &str,
        ) -> anyhow::Result<Option<TechBackground>> {
            self.inner.get_tech_background(user_id).await
        }
        async fn upsert_summary(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
            self.inner.upsert_summary(user_id, text).await
        }
        async fn get_summary(&self, user_id: &str) -> anyhow::Result<Option<ProfileSummary>> {
            if user_id == self.broken_for {
                anyhow::bail!("connection reset");
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
            self.inner.find_intro_request(requester_id, target_id).await
        }
        async fn list_intro_requests(&self, user_id: &str) -> anyhow::Result<Vec<IntroRequest>> {
            self.inner.list_intro_requests(user_id).await
        }
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn requester_summary_failure_aborts_without_rationale_calls() {
        let inner = MemoryProfileStore::new();
        inner.upsert_summary("cto0", "cto0 summary").await.unwrap();
        let store = Arc::new(SummaryOutage {
            inner,
            broken_for: "ceo".to_string(),
        });
        let advisor = Arc::new(ScriptedAdvisor::default());

        let result = MatchEnricher::new(store, advisor.clone(), 5, 5)
            .enrich("ceo", Role::Ceo, &[candidate("cto0", 0.9)])
            .await;

        assert!(matches!(result, Err(MatchError::RequesterSummary(_))));
        assert!(advisor.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn candidate_summary_failure_degrades_to_empty_text() {
        let store = Arc::new(SummaryOutage {
            inner: MemoryProfileStore::new(),
            broken_for: "cto0".to_string(),
        });
        store.upsert_summary("ceo", "ceo summary").await.unwrap();
        let advisor = Arc::new(ScriptedAdvisor::default());

        let enriched = MatchEnricher::new(store, advisor.clone(), 5, 5)
            .enrich("ceo", Role::Ceo, &[candidate("cto0", 0.9)])
            .await
            .unwrap();

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].rationale, "ceo summary + ");
    }

    #[tokio::test]
    async fn enrichment_runs_on_a_spawned_task() {
        let store = store_with_ctos(2).await;
        let advisor = Arc::new(ScriptedAdvisor::default());
        let enricher = Arc::new(enricher(store, advisor));
        let candidates = vec![candidate("cto0", 0.9), candidate("cto1", 0.8)];

        // tokio::spawn needs a Send + 'static future, same as an axum handler.
        let enriched = tokio::spawn(async move {
            enricher.enrich("ceo", Role::Ceo, &candidates).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].user_id, "cto0");
    }
}
