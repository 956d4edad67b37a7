//! Data models for vector database operations

use serde::{Deserialize, Serialize};

/// Search parameters
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Query vector
    pub vector: Vec<f32>,

    /// Maximum number of results
    pub limit: usize,

    /// Minimum similarity score
    pub score_threshold: f32,
}

impl SearchParams {
    pub fn new(vector: Vec<f32>, limit: usize, score_threshold: f32) -> Self {
        Self {
            vector,
            limit,
            score_threshold,
        }
    }
}

/// A knowledge-base passage returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Point ID as reported by the store
    pub id: String,

    /// Similarity score
    pub score: f32,

    /// Source URL (Jira ticket, errata, documentation page)
    pub url: Option<String>,

    /// Section of the source the passage was taken from
    pub kind: Option<String>,

    pub text: Option<String>,

    /// Software components related to the passage
    #[serde(default)]
    pub components: Vec<String>,

    /// Collection the passage came from
    pub collection: String,
}
