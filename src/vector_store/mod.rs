pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::profile::{Embedding, Role};

/// Abstract store for profile embeddings.
///
/// Embeddings are append-only: a regenerated summary inserts a new row and the
/// newest row per (owner, source) is the current one.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Append an embedding.
    async fn insert(&self, embedding: &Embedding) -> anyhow::Result<()>;

    /// Most recently created embedding for an owner and source tag.
    async fn get_own(&self, owner_id: &str, source: &str) -> anyhow::Result<Option<Embedding>>;

    /// Current embedding of every owner with the given role and source tag.
    async fn list_by_role(&self, role: Role, source: &str) -> anyhow::Result<Vec<Embedding>>;

    /// Initialize the store (create tables, etc.).
    async fn initialize(&self) -> anyhow::Result<()>;
}
