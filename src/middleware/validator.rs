//! Input validation for prompt parameters

use reqwest::Url;
use tracing::{debug, warn};

/// Lowest accepted sampling temperature
pub const MIN_TEMPERATURE: f64 = 0.1;

/// Highest accepted sampling temperature
pub const MAX_TEMPERATURE: f64 = 1.0;

/// Highest accepted completion budget
pub const MAX_TOKENS_LIMIT: u32 = 1024;

/// Input validator
pub struct InputValidator;

impl InputValidator {
    /// Validate prompt content
    pub fn validate_content(text: &str) -> Result<(), ValidationError> {
        if text.trim().is_empty() {
            warn!("Validation failed: empty content");
            return Err(ValidationError::EmptyInput);
        }

        debug!("Content validation passed");
        Ok(())
    }

    /// Validate similarity threshold, which must lie in (0, 1]
    pub fn validate_similarity_threshold(value: f64) -> Result<(), ValidationError> {
        if !(value > 0.0 && value <= 1.0) {
            warn!("Validation failed: similarity threshold {} out of range", value);
            return Err(ValidationError::ThresholdOutOfRange { value });
        }
        Ok(())
    }

    /// Validate sampling temperature, which must lie in [0.1, 1.0]
    pub fn validate_temperature(value: f64) -> Result<(), ValidationError> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&value) {
            warn!("Validation failed: temperature {} out of range", value);
            return Err(ValidationError::TemperatureOutOfRange { value });
        }
        Ok(())
    }

    /// Validate completion budget, which must lie in [1, 1024]
    pub fn validate_max_tokens(value: u32) -> Result<(), ValidationError> {
        if !(1..=MAX_TOKENS_LIMIT).contains(&value) {
            warn!("Validation failed: max_tokens {} out of range", value);
            return Err(ValidationError::MaxTokensOutOfRange { value });
        }
        Ok(())
    }

    /// Validate a report URL; only http and https are fetched
    pub fn validate_report_url(raw: &str) -> Result<Url, ValidationError> {
        let url = Url::parse(raw.trim()).map_err(|e| {
            warn!("Validation failed: unparsable report URL: {}", e);
            ValidationError::InvalidUrl(raw.to_string())
        })?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => {
                warn!("Validation failed: unsupported report URL {}", raw);
                Err(ValidationError::InvalidUrl(raw.to_string()))
            }
        }
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("content must not be empty")]
    EmptyInput,

    #[error("threshold out of range: {value} (must be greater than 0 and at most 1)")]
    ThresholdOutOfRange { value: f64 },

    #[error("temperature out of range: {value} (must be between 0.1 and 1.0)")]
    TemperatureOutOfRange { value: f64 },

    #[error("max_tokens out of range: {value} (must be between 1 and 1024)")]
    MaxTokensOutOfRange { value: u32 },

    #[error("Invalid profile name. Available profiles are: ({})", .available.join(", "))]
    InvalidProfile { available: Vec<String> },

    #[error("Invalid collection name. Available collections are: ({})", .available.join(", "))]
    InvalidCollection { available: Vec<String> },

    #[error("Invalid generative model name. Available models are: ({})", .available.join(", "))]
    InvalidGenerativeModel { available: Vec<String> },

    #[error("Invalid embeddings model name. Available models are: ({})", .available.join(", "))]
    InvalidEmbeddingsModel { available: Vec<String> },

    #[error(
        "Your input is too lengthy! We can process inputs of up to approximately \
         {approx_max_chars} characters. Please include only the most relevant details \
         and shorten your input."
    )]
    InputTooLong { approx_max_chars: usize },

    #[error("Invalid tempest report URL: {0}")]
    InvalidUrl(String),
}
