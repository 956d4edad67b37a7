//! Wire models for the OpenAI-compatible embeddings API

use serde::{Deserialize, Serialize};

/// Request to generate an embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed
    pub input: String,

    /// Model name
    pub model: String,

    /// Always `float`
    pub encoding_format: String,
}

/// Response from embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,

    /// Model used for generation
    #[serde(default)]
    pub model: Option<String>,
}

/// Individual embedding data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,

    #[serde(default)]
    pub index: usize,
}

/// Body of the vLLM `/tokenize` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeRequest {
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeResponse {
    pub count: usize,
}

/// `/models` listing shared by the embeddings and generation backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            input: text.into(),
            model: model.into(),
            encoding_format: "float".to_string(),
        }
    }
}

impl ModelList {
    /// Model identifiers in backend order
    pub fn ids(self) -> Vec<String> {
        self.data.into_iter().map(|m| m.id).collect()
    }
}
