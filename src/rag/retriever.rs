//! Knowledge-base retrieval

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::observability::MetricsCollector;
use crate::vector_db::{ScoredDocument, SearchParams, VectorStore};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Embeds a query and searches one collection
#[derive(Clone)]
pub struct Retriever {
    embedding_client: Arc<dyn EmbeddingProvider>,
    vector_db: Arc<dyn VectorStore>,
    top_n: usize,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Retriever {
    pub fn new(
        embedding_client: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorStore>,
        top_n: usize,
    ) -> Self {
        Self {
            embedding_client,
            vector_db,
            top_n,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Documents scoring at least `threshold`, best first, at most `top_n`
    pub async fn retrieve(
        &self,
        content: &str,
        embeddings_model: &str,
        collection: &str,
        threshold: f32,
    ) -> Result<Vec<ScoredDocument>> {
        let start = Instant::now();
        let vector = self.embedding_client.embed(content, embeddings_model).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_embedding_latency(start.elapsed());
        }

        let start = Instant::now();
        let params = SearchParams::new(vector, self.top_n, threshold);
        let results = self.vector_db.search(collection, params).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_vector_db_latency(start.elapsed());
        }

        let documents = rank(results, threshold, self.top_n);
        debug!(
            "Retrieved {} documents from {} above {}",
            documents.len(),
            collection,
            threshold
        );
        Ok(documents)
    }
}

/// Keep scores at or above `threshold`, sort descending, cap at `top_n`.
/// Equal scores keep the store's order.
pub fn rank(mut documents: Vec<ScoredDocument>, threshold: f32, top_n: usize) -> Vec<ScoredDocument> {
    documents.retain(|d| d.score >= threshold);
    documents.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    documents.truncate(top_n);
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            id: id.to_string(),
            score,
            url: None,
            kind: None,
            text: None,
            components: vec![],
            collection: "jira".to_string(),
        }
    }

    #[test]
    fn test_rank_filters_and_sorts() {
        let docs = vec![doc("a", 0.70), doc("b", 0.90), doc("c", 0.75), doc("d", 0.80)];
        let ranked = rank(docs, 0.75, 10);

        let ids: Vec<_> = ranked.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
    }

    #[test]
    fn test_rank_ties_keep_order() {
        let docs = vec![doc("first", 0.8), doc("second", 0.8), doc("top", 0.9)];
        let ranked = rank(docs, 0.5, 10);

        let ids: Vec<_> = ranked.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "first", "second"]);
    }

    #[test]
    fn test_rank_caps_results() {
        let docs = (0..10).map(|i| doc(&i.to_string(), 0.9)).collect();
        assert_eq!(rank(docs, 0.5, 3).len(), 3);
    }
}
