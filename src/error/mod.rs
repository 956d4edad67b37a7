//! Error types for the RCA accelerator

use thiserror::Error;

/// Result type alias for RCA accelerator operations
pub type Result<T> = std::result::Result<T, RcaError>;

/// Main error type for the RCA accelerator
#[derive(Error, Debug)]
pub enum RcaError {
    #[error("{0}")]
    Validation(#[from] crate::middleware::ValidationError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Tempest report error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classes reported to API clients and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    BackendUnavailable,
    Fetch,
    ModelNotFound,
    Internal,
}

impl RcaError {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            RcaError::Validation(_) => ErrorCategory::Validation,
            RcaError::Embedding(EmbeddingError::ModelNotFound(_)) => ErrorCategory::ModelNotFound,
            RcaError::Embedding(_) => ErrorCategory::BackendUnavailable,
            RcaError::Generation(GenerationError::ModelNotFound(_)) => ErrorCategory::ModelNotFound,
            RcaError::Generation(_) => ErrorCategory::BackendUnavailable,
            RcaError::VectorDb(_) => ErrorCategory::BackendUnavailable,
            RcaError::Fetch(_) => ErrorCategory::Fetch,
            RcaError::Config(_) | RcaError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Errors related to embedding generation and tokenization
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Empty embedding response for model {0}")]
    EmptyResponse(String),
}

/// Errors related to text generation
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Generative model not found: {0}")]
    ModelNotFound(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Request size exceeded the model context window, please shorten the input")]
    ContextLengthExceeded,

    #[error("Model {0} returned no choices")]
    EmptyResponse(String),
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Errors raised while fetching a Tempest report
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Report at {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Report at {url} is not an HTML document")]
    NotHtml { url: String },

    #[error("Report is too large: {size} bytes (max: {max_size} bytes)")]
    TooLarge { size: usize, max_size: usize },
}

impl From<config::ConfigError> for RcaError {
    fn from(err: config::ConfigError) -> Self {
        RcaError::Config(err.to_string())
    }
}
