//! Text generation against OpenAI-compatible chat backends

pub mod client;
pub mod models;

pub use client::GenerationClient;
pub use models::{ChatMessage, GenerationRequest, Role};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for generation providers
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Run one chat completion and return the assistant text
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Models served by the backend
    async fn list_models(&self) -> Result<Vec<String>>;
}
