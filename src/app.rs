use std::sync::Arc;
use std::time::Duration;

use crate::advisor::ProfileAdvisor;
use crate::config::Settings;
use crate::database::ProfileStore;
use crate::embedding::EmbeddingModel;
use crate::matching::enricher::MatchEnricher;
use crate::matching::ranker::CandidateRanker;
use crate::matching::MatchService;
use crate::rate_limit::{RateLimiter, SlidingWindowLimiter};
use crate::vector_store::EmbeddingStore;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub embedding_store: Arc<dyn EmbeddingStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub embedding_model: Arc<dyn EmbeddingModel>,
    pub advisor: Arc<dyn ProfileAdvisor>,
    pub matcher: MatchService,
    pub api_limiter: Arc<dyn RateLimiter>,
    pub auth_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Wire the matching pipeline and limiters from settings.
    pub fn new(
        settings: Settings,
        embedding_store: Arc<dyn EmbeddingStore>,
        profiles: Arc<dyn ProfileStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
        advisor: Arc<dyn ProfileAdvisor>,
    ) -> Self {
        let ranker = CandidateRanker::new(
            embedding_store.clone(),
            settings.match_source.clone(),
            settings.rank_limit,
        );
        let enricher = MatchEnricher::new(
            profiles.clone(),
            advisor.clone(),
            settings.preview_limit,
            settings.enrich_concurrency,
        );
        let window = Duration::from_secs(settings.rate_limit_window_secs);
        let api_limiter = Arc::new(SlidingWindowLimiter::api(
            settings.api_max_requests,
            window,
            settings.rate_limit_enabled,
        ));
        let auth_limiter = Arc::new(SlidingWindowLimiter::auth(
            settings.auth_max_requests,
            window,
            settings.rate_limit_enabled,
        ));

        Self {
            settings,
            embedding_store,
            profiles,
            embedding_model,
            advisor,
            matcher: MatchService::new(ranker, enricher),
            api_limiter,
            auth_limiter,
        }
    }

    /// Swap in different limiters, e.g. a shared backend.
    pub fn with_limiters(
        mut self,
        api_limiter: Arc<dyn RateLimiter>,
        auth_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        self.api_limiter = api_limiter;
        self.auth_limiter = auth_limiter;
        self
    }
}
