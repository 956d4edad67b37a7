//! In-memory backends shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rca_accelerator::{
    config::Config,
    embedding::EmbeddingProvider,
    error::{EmbeddingError, GenerationError, Result, VectorDbError},
    generation::{GenerationProvider, GenerationRequest},
    rag::RcaPipeline,
    vector_db::{ScoredDocument, SearchParams, VectorStore},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EMBEDDINGS_MODEL: &str = "BAAI/bge-m3";
pub const GENERATIVE_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.3";
pub const COLLECTION: &str = "rca-knowledge-base";

pub struct FakeEmbedding {
    pub available: bool,
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedding {
    async fn embed(&self, _text: &str, _model: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3, 0.4])
    }

    async fn count_tokens(&self, text: &str, _model: &str) -> Result<usize> {
        Ok(text.len() / 4 + 1)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        if self.available {
            Ok(vec![EMBEDDINGS_MODEL.to_string()])
        } else {
            Err(EmbeddingError::ApiError("connection refused".to_string()).into())
        }
    }
}

/// Answers every request and remembers what it was asked
#[derive(Default)]
pub struct FakeGeneration {
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGeneration {
    pub fn user_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl GenerationProvider for FakeGeneration {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if request.model != GENERATIVE_MODEL {
            return Err(GenerationError::ModelNotFound(request.model.clone()).into());
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok("The compute node ran out of memory.".to_string())
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![GENERATIVE_MODEL.to_string()])
    }
}

/// Generation whose behaviour depends on the test named in the prompt
#[derive(Default)]
pub struct ScriptedGeneration {
    /// Tests named by the key are answered after the delay
    pub slow: Vec<(String, Duration)>,
    /// Tests with these names fail
    pub failing: Vec<String>,
    /// Test names in the order their answers completed
    pub completed: Mutex<Vec<String>>,
}

impl ScriptedGeneration {
    fn test_name(prompt: &str) -> String {
        prompt
            .split("Tempest test ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGeneration {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let name = Self::test_name(&prompt);

        if let Some((_, delay)) = self.slow.iter().find(|(key, _)| name == *key) {
            tokio::time::sleep(*delay).await;
        }
        self.completed.lock().unwrap().push(name.clone());

        if self.failing.contains(&name) {
            return Err(GenerationError::ApiError(format!("backend refused {}", name)).into());
        }
        Ok(format!("Analysis of {}", name))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![GENERATIVE_MODEL.to_string()])
    }
}

/// Returns the same documents for every search
pub struct FakeStore {
    pub documents: Vec<ScoredDocument>,
    pub available: bool,
}

impl FakeStore {
    pub fn with_documents(documents: Vec<ScoredDocument>) -> Self {
        Self {
            documents,
            available: true,
        }
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn search(&self, collection: &str, _params: SearchParams) -> Result<Vec<ScoredDocument>> {
        if !self.available {
            return Err(VectorDbError::ConnectionError("refused".to_string()).into());
        }
        Ok(self
            .documents
            .iter()
            .filter(|d| d.collection == collection)
            .cloned()
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        if self.available {
            Ok(vec![COLLECTION.to_string(), "errata".to_string()])
        } else {
            Err(VectorDbError::ConnectionError("refused".to_string()).into())
        }
    }
}

pub fn document(id: &str, score: f32, url: &str) -> ScoredDocument {
    ScoredDocument {
        id: id.to_string(),
        score,
        url: Some(url.to_string()),
        kind: Some("comment".to_string()),
        text: Some(format!("Passage {}", id)),
        components: vec!["nova".to_string()],
        collection: COLLECTION.to_string(),
    }
}

pub fn pipeline(
    embedding: FakeEmbedding,
    generation: Arc<FakeGeneration>,
    store: FakeStore,
) -> RcaPipeline {
    RcaPipeline::new(
        Arc::new(Config::default_config()),
        Arc::new(embedding),
        generation,
        Arc::new(store),
    )
}
