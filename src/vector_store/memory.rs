use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::profile::{Embedding, Role};
use crate::vector_store::EmbeddingStore;

/// In-process embedding store for development and tests.
#[derive(Default)]
pub struct MemoryEmbeddingStore {
    rows: RwLock<Vec<Embedding>>,
}

impl MemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

/// Newest row per owner for `source`, by `(created_at, insertion order)`.
///
/// The role filter applies after this, so an owner who switched roles only
/// shows up under the current one.
fn latest_per_owner<'a>(
    rows: &'a [Embedding],
    source: &str,
) -> HashMap<&'a str, (usize, &'a Embedding)> {
    let mut latest: HashMap<&str, (usize, &Embedding)> = HashMap::new();
    for (i, e) in rows.iter().enumerate().filter(|(_, e)| e.source == source) {
        match latest.get(e.owner_id.as_str()) {
            Some((j, current)) if (current.created_at, *j) > (e.created_at, i) => {}
            _ => {
                latest.insert(e.owner_id.as_str(), (i, e));
            }
        }
    }
    latest
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn insert(&self, embedding: &Embedding) -> anyhow::Result<()> {
        self.rows.write().await.push(embedding.clone());
        Ok(())
    }

    async fn get_own(&self, owner_id: &str, source: &str) -> anyhow::Result<Option<Embedding>> {
        let rows = self.rows.read().await;
        let latest = latest_per_owner(&rows, source)
            .remove(owner_id)
            .map(|(_, e)| e.clone());
        Ok(latest)
    }

    async fn list_by_role(&self, role: Role, source: &str) -> anyhow::Result<Vec<Embedding>> {
        let rows = self.rows.read().await;
        let mut current: Vec<(usize, &Embedding)> = latest_per_owner(&rows, source)
            .into_values()
            .filter(|(_, e)| e.role == role)
            .collect();
        current.sort_by_key(|(i, _)| *i);
        Ok(current.into_iter().map(|(_, e)| e.clone()).collect())
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn embedding(owner: &str, role: Role, source: &str, vector: Vec<f32>) -> Embedding {
        Embedding {
            owner_id: owner.to_string(),
            role,
            source: source.to_string(),
            vector,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_own_returns_most_recent() {
        let store = MemoryEmbeddingStore::new();
        let mut old = embedding("u1", Role::Ceo, "summary", vec![1.0, 0.0]);
        old.created_at = Utc::now() - Duration::hours(1);
        store.insert(&old).await.unwrap();
        store
            .insert(&embedding("u1", Role::Ceo, "summary", vec![0.0, 1.0]))
            .await
            .unwrap();

        let own = store.get_own("u1", "summary").await.unwrap().unwrap();
        assert_eq!(own.vector, vec![0.0, 1.0]);
        assert!(store.get_own("u1", "other").await.unwrap().is_none());
        assert!(store.get_own("u2", "summary").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_role_filters_role_and_source() {
        let store = MemoryEmbeddingStore::new();
        store.insert(&embedding("ceo", Role::Ceo, "summary", vec![1.0])).await.unwrap();
        store.insert(&embedding("cto1", Role::Cto, "summary", vec![1.0])).await.unwrap();
        store.insert(&embedding("cto2", Role::Cto, "bio", vec![1.0])).await.unwrap();

        let ctos = store.list_by_role(Role::Cto, "summary").await.unwrap();
        assert_eq!(ctos.len(), 1);
        assert_eq!(ctos[0].owner_id, "cto1");
    }

    #[tokio::test]
    async fn test_list_by_role_keeps_one_row_per_owner() {
        let store = MemoryEmbeddingStore::new();
        store.insert(&embedding("cto1", Role::Cto, "summary", vec![1.0])).await.unwrap();
        store.insert(&embedding("cto2", Role::Cto, "summary", vec![2.0])).await.unwrap();
        store.insert(&embedding("cto1", Role::Cto, "summary", vec![3.0])).await.unwrap();

        let ctos = store.list_by_role(Role::Cto, "summary").await.unwrap();
        assert_eq!(ctos.len(), 2);
        let cto1 = ctos.iter().find(|e| e.owner_id == "cto1").unwrap();
        assert_eq!(cto1.vector, vec![3.0]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_list_by_role_and_get_own_agree_on_newest_row() {
        let store = MemoryEmbeddingStore::new();
        store.insert(&embedding("cto1", Role::Cto, "summary", vec![1.0])).await.unwrap();
        // Backfilled row: inserted later but created earlier.
        let mut backfill = embedding("cto1", Role::Cto, "summary", vec![9.0]);
        backfill.created_at = Utc::now() - Duration::days(1);
        store.insert(&backfill).await.unwrap();

        let own = store.get_own("cto1", "summary").await.unwrap().unwrap();
        let listed = store.list_by_role(Role::Cto, "summary").await.unwrap();
        assert_eq!(own.vector, vec![1.0]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].vector, own.vector);
    }

    #[tokio::test]
    async fn test_role_switch_leaves_only_current_pool() {
        let store = MemoryEmbeddingStore::new();
        let mut first = embedding("u1", Role::Ceo, "summary", vec![1.0, 0.0]);
        first.created_at = Utc::now() - Duration::hours(2);
        store.insert(&first).await.unwrap();
        store
            .insert(&embedding("u1", Role::Cto, "summary", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .insert(&embedding("u2", Role::Ceo, "summary", vec![1.0, 1.0]))
            .await
            .unwrap();

        let ceos = store.list_by_role(Role::Ceo, "summary").await.unwrap();
        let ctos = store.list_by_role(Role::Cto, "summary").await.unwrap();
        assert_eq!(ceos.len(), 1);
        assert_eq!(ceos[0].owner_id, "u2");
        assert_eq!(ctos.len(), 1);
        assert_eq!(ctos[0].owner_id, "u1");
        assert_eq!(ctos[0].vector, vec![0.0, 1.0]);
    }
}
