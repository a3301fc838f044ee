use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::profile::{Embedding, Role};
use crate::vector_store::EmbeddingStore;

/// PostgreSQL embedding store. Vectors are kept as `REAL[]` and scored in process.
pub struct PostgresEmbeddingStore {
    pool: PgPool,
    dimensions: u32,
}

impl PostgresEmbeddingStore {
    /// Share an existing pool with the profile database.
    pub fn from_pool(pool: PgPool, dimensions: u32) -> Self {
        Self { pool, dimensions }
    }
}

fn row_to_embedding(row: &PgRow) -> anyhow::Result<Embedding> {
    let role: String = row.try_get("role")?;
    Ok(Embedding {
        owner_id: row.try_get("user_id")?,
        role: role.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        source: row.try_get("source")?,
        vector: row.try_get("vector")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl EmbeddingStore for PostgresEmbeddingStore {
    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS embeddings (
                id BIGSERIAL PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                role VARCHAR(8) NOT NULL,
                source VARCHAR(64) NOT NULL,
                vector REAL[] NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_embeddings_owner
             ON embeddings(user_id, source, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_role ON embeddings(role, source)")
            .execute(&self.pool)
            .await?;

        info!("Embedding table initialized (dimensions={})", self.dimensions);
        Ok(())
    }

    async fn insert(&self, embedding: &Embedding) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO embeddings (user_id, role, source, vector, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&embedding.owner_id)
        .bind(embedding.role.as_str())
        .bind(&embedding.source)
        .bind(&embedding.vector)
        .bind(embedding.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_own(&self, owner_id: &str, source: &str) -> anyhow::Result<Option<Embedding>> {
        let row = sqlx::query(
            "SELECT user_id, role, source, vector, created_at
             FROM embeddings
             WHERE user_id = $1 AND source = $2
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(owner_id)
        .bind(source)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_embedding).transpose()
    }

    async fn list_by_role(&self, role: Role, source: &str) -> anyhow::Result<Vec<Embedding>> {
        let rows = sqlx::query(
            "SELECT user_id, role, source, vector, created_at
             FROM (
                 SELECT DISTINCT ON (user_id) user_id, role, source, vector, created_at
                 FROM embeddings
                 WHERE source = $2
                 ORDER BY user_id, created_at DESC, id DESC
             ) latest
             WHERE role = $1",
        )
        .bind(role.as_str())
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_embedding).collect()
    }
}
