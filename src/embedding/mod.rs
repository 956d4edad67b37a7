//! Embedding service for OpenAI-compatible embeddings backends

pub mod cache;
pub mod client;
pub mod models;

pub use cache::EmbeddingCache;
pub use client::EmbeddingClient;
pub use models::{EmbeddingRequest, EmbeddingResponse, ModelList};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding of `text` with `model`
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>>;

    /// Number of tokens `text` occupies for `model`
    async fn count_tokens(&self, text: &str, model: &str) -> Result<usize>;

    /// Models served by the backend
    async fn list_models(&self) -> Result<Vec<String>>;
}
