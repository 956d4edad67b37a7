//! RCA Accelerator - retrieval-augmented root cause analysis for CI failures
//!
//! The service answers free-form questions about CI failures using a Qdrant
//! knowledge base and an OpenAI-compatible generative model, and analyses
//! every failing test of a Tempest HTML report the same way.
//!
//! ## Features
//!
//! - **Prompt pipeline**: validation, retrieval, context-bounded prompting and generation
//! - **Tempest reports**: failing tests are extracted, deduplicated and analysed concurrently
//! - **Circuit Breaker Protection**: vector store calls fail fast while Qdrant is down
//! - **Rate Limiting**: per-client request windows on the analysis endpoints
//! - **Observability**: Prometheus metrics and cached health checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rca_accelerator::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Arc::new(Config::from_env()?);
//!
//!     let pipeline = RcaPipeline::new(
//!         Arc::clone(&config),
//!         Arc::new(EmbeddingClient::new(config.embedding.clone())?),
//!         Arc::new(GenerationClient::new(config.generation.clone())?),
//!         Arc::new(VectorDbClient::new(&config.vector_db)?),
//!     );
//!
//!     let answer = pipeline
//!         .handle_prompt(PromptRequest::with_content("Why did the nova job time out?"))
//!         .await;
//!     println!("{}", serde_json::to_string(&answer).unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod observability;
pub mod rag;
pub mod shutdown;
pub mod tempest;
pub mod vector_db;

pub use config::Config;
pub use error::{RcaError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::embedding::{EmbeddingClient, EmbeddingProvider};
    pub use crate::error::{ErrorCategory, RcaError, Result};
    pub use crate::generation::{GenerationClient, GenerationProvider};
    pub use crate::middleware::{InputValidator, RateLimitConfig, RateLimiter};
    pub use crate::observability::{HealthChecker, MetricsCollector};
    pub use crate::rag::{PromptRequest, PromptResponse, RcaEntry, RcaPipeline};
    pub use crate::tempest::TempestAnalyzer;
    pub use crate::vector_db::{VectorDbClient, VectorStore};
}
