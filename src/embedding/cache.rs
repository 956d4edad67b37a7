//! Embedding cache backed by moka

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

/// Async cache of embeddings keyed by model and text
pub struct EmbeddingCache {
    cache: Cache<String, Vec<f32>>,
}

impl EmbeddingCache {
    /// Create a new cache with specified capacity and TTL
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        info!("Initializing embedding cache with max_size={}, ttl={:?}", max_size, ttl);

        let cache = Cache::builder()
            .max_capacity(max_size as u64)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// SHA-256 of model and text, so the same text embedded by two models never collides
    pub fn key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("emb_{}", hex::encode(hasher.finalize()))
    }

    pub async fn get(&self, key: &str) -> Option<Vec<f32>> {
        let result = self.cache.get(key).await;
        debug!("Embedding cache {} for {}", if result.is_some() { "hit" } else { "miss" }, key);
        result
    }

    pub async fn put(&self, key: String, embedding: Vec<f32>) {
        self.cache.insert(key, embedding).await;
    }

    /// Number of live entries
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
