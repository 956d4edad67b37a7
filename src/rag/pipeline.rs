//! End-to-end prompt handling

use super::assembler::ResponseAssembler;
use super::models::{Availability, PromptRequest, PromptResponse, ResolvedPrompt};
use super::prompt::PromptBuilder;
use super::retriever::Retriever;
use super::token_estimator::TokenEstimator;
use super::validator::RequestValidator;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::{GenerationProvider, GenerationRequest};
use crate::middleware::ValidationError;
use crate::observability::MetricsCollector;
use crate::vector_db::VectorStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Validates, retrieves, prompts and generates
pub struct RcaPipeline {
    config: Arc<Config>,
    embedding_client: Arc<dyn EmbeddingProvider>,
    generation_client: Arc<dyn GenerationProvider>,
    vector_db: Arc<dyn VectorStore>,
    retriever: Retriever,
    prompt_builder: PromptBuilder,
    token_estimator: TokenEstimator,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RcaPipeline {
    pub fn new(
        config: Arc<Config>,
        embedding_client: Arc<dyn EmbeddingProvider>,
        generation_client: Arc<dyn GenerationProvider>,
        vector_db: Arc<dyn VectorStore>,
    ) -> Self {
        info!("Initializing RCA pipeline");

        let retriever = Retriever::new(
            Arc::clone(&embedding_client),
            Arc::clone(&vector_db),
            config.search.top_n,
        );
        let prompt_builder = PromptBuilder::new(&config);

        Self {
            config,
            embedding_client,
            generation_client,
            vector_db,
            retriever,
            prompt_builder,
            token_estimator: TokenEstimator::default(),
            metrics: None,
        }
    }

    /// Set metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.retriever = self.retriever.with_metrics(Arc::clone(&metrics));
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Answer one prompt; every failure is reported in-band
    pub async fn handle_prompt(&self, request: PromptRequest) -> PromptResponse {
        let start = Instant::now();

        let outcome = match RequestValidator::resolve(request, &self.config) {
            Ok(resolved) => match self.discover().await {
                Ok(availability) => self.run(resolved, &availability).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e.into()),
        };

        self.finish(outcome, start)
    }

    /// Answer one prompt against an already discovered `availability`
    pub async fn handle_prompt_with(
        &self,
        request: PromptRequest,
        availability: &Availability,
    ) -> PromptResponse {
        let start = Instant::now();
        let outcome = match RequestValidator::resolve(request, &self.config) {
            Ok(resolved) => self.run(resolved, availability).await,
            Err(e) => Err(e.into()),
        };
        self.finish(outcome, start)
    }

    fn finish(&self, outcome: Result<PromptResponse>, start: Instant) -> PromptResponse {
        let (response, category) = match outcome {
            Ok(response) => (response, None),
            Err(e) => {
                warn!("Prompt failed ({:?}): {}", e.category(), e);
                (ResponseAssembler::failure(&e), Some(e.category()))
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_prompt(start.elapsed(), category);
        }
        response
    }

    /// Ask every backend what it serves, concurrently
    pub async fn discover(&self) -> Result<Availability> {
        let (generative_models, embeddings_models, collections) = tokio::try_join!(
            self.generation_client.list_models(),
            self.embedding_client.list_models(),
            self.vector_db.list_collections(),
        )?;

        debug!(
            "Discovered {} generative models, {} embeddings models, {} collections",
            generative_models.len(),
            embeddings_models.len(),
            collections.len()
        );

        Ok(Availability {
            generative_models,
            embeddings_models,
            collections,
        })
    }

    async fn run(&self, resolved: ResolvedPrompt, availability: &Availability) -> Result<PromptResponse> {
        RequestValidator::check_availability(&resolved, availability)?;
        self.check_length(&resolved).await?;

        let documents = self
            .retriever
            .retrieve(
                &resolved.content,
                &resolved.embeddings_model,
                &resolved.collection,
                resolved.similarity_threshold as f32,
            )
            .await?;

        let prompt = self
            .prompt_builder
            .build(resolved.profile, &documents, &resolved.content);

        let request = GenerationRequest {
            messages: prompt.messages,
            model: resolved.generative_model,
            temperature: resolved.temperature as f32,
            max_tokens: resolved.max_tokens,
        };

        let start = Instant::now();
        let text = self.generation_client.generate(&request).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_generation_latency(start.elapsed());
        }

        Ok(ResponseAssembler::success(text, &documents))
    }

    /// Reject content longer than the embeddings model accepts
    async fn check_length(&self, resolved: &ResolvedPrompt) -> Result<()> {
        let max_context = self.config.embedding.max_context;

        let tokens = if self.config.embedding.tokenize_enabled {
            self.embedding_client
                .count_tokens(&resolved.content, &resolved.embeddings_model)
                .await?
        } else {
            self.token_estimator.estimate(&resolved.content)
        };

        if tokens > max_context {
            warn!("Input of {} tokens exceeds limit of {}", tokens, max_context);
            return Err(ValidationError::InputTooLong {
                approx_max_chars: self.token_estimator.approx_max_chars(max_context),
            }
            .into());
        }

        Ok(())
    }
}
