//! Vector database integration with Qdrant

pub mod circuit_breaker;
pub mod client;
pub mod models;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::VectorDbClient;
pub use models::{ScoredDocument, SearchParams};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for vector storage operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search `collection` for passages similar to `params.vector`
    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<ScoredDocument>>;

    /// Names of the collections in the store
    async fn list_collections(&self) -> Result<Vec<String>>;
}
