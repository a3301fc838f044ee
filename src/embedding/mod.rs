pub mod openai;

use async_trait::async_trait;

/// Abstract text embedding model interface.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Return the embedding dimensions.
    fn dimensions(&self) -> u32;
}
