pub mod enricher;
pub mod ranker;
pub mod similarity;

use thiserror::Error;

use crate::models::profile::{EnrichedMatch, Role};
use enricher::MatchEnricher;
use ranker::CandidateRanker;

/// Failures that abort a whole match computation.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("embedding store error: {0}")]
    Store(anyhow::Error),
    #[error("requester summary lookup failed: {0}")]
    RequesterSummary(anyhow::Error),
}

/// Rank then enrich: the full preview pipeline for one requester.
pub struct MatchService {
    ranker: CandidateRanker,
    enricher: MatchEnricher,
}

impl MatchService {
    pub fn new(ranker: CandidateRanker, enricher: MatchEnricher) -> Self {
        Self { ranker, enricher }
    }

    pub async fn preview(
        &self,
        requester_id: &str,
        requester_role: Role,
    ) -> Result<Vec<EnrichedMatch>, MatchError> {
        let candidates = self.ranker.rank(requester_id, requester_role).await?;
        self.enricher
            .enrich(requester_id, requester_role, &candidates)
            .await
    }
}
