use std::sync::Arc;
use tracing::{debug, warn};

use super::similarity::cosine_similarity;
use super::MatchError;
use crate::models::profile::{Candidate, Embedding, Role};
use crate::vector_store::EmbeddingStore;

/// Scores every counterpart embedding against the requester's and keeps the top `limit`.
pub struct CandidateRanker {
    store: Arc<dyn EmbeddingStore>,
    source: String,
    limit: usize,
}

impl CandidateRanker {
    pub fn new(store: Arc<dyn EmbeddingStore>, source: impl Into<String>, limit: usize) -> Self {
        Self {
            store,
            source: source.into(),
            limit,
        }
    }

    /// Rank counterpart candidates for `requester_id`.
    ///
    /// A requester without a stored embedding gets an empty list and the
    /// counterpart pool is never fetched.
    pub async fn rank(
        &self,
        requester_id: &str,
        requester_role: Role,
    ) -> Result<Vec<Candidate>, MatchError> {
        let Some(own) = self
            .store
            .get_own(requester_id, &self.source)
            .await
            .map_err(MatchError::Store)?
        else {
            debug!(user_id = requester_id, "No embedding yet; skipping ranking");
            return Ok(Vec::new());
        };

        let counterpart = requester_role.counterpart();
        let pool = self
            .store
            .list_by_role(counterpart, &self.source)
            .await
            .map_err(MatchError::Store)?;

        debug!(
            user_id = requester_id,
            pool = pool.len(),
            "Scoring {counterpart} candidates"
        );
        Ok(rank_candidates(
            &own.vector,
            requester_id,
            counterpart,
            pool,
            self.limit,
        ))
    }
}

/// Score, sort and truncate a candidate pool.
///
/// Order is by score descending, then user id ascending. Rows for the
/// requester or for the wrong role are dropped.
pub fn rank_candidates(
    query: &[f32],
    requester_id: &str,
    counterpart: Role,
    pool: Vec<Embedding>,
    limit: usize,
) -> Vec<Candidate> {
    let mut scored: Vec<Candidate> = pool
        .into_iter()
        .filter(|e| {
            if e.owner_id == requester_id || e.role != counterpart {
                warn!(
                    user_id = requester_id,
                    owner_id = %e.owner_id,
                    role = %e.role,
                    "Dropping inconsistent candidate row"
                );
                return false;
            }
            true
        })
        .map(|e| Candidate {
            score: cosine_similarity(query, &e.vector),
            user_id: e.owner_id,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    scored.truncate(limit);
    scored
}
