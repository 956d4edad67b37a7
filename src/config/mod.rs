//! Configuration management for the RCA accelerator

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub vector_db: VectorDbConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub model_defaults: ModelDefaults,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tempest: TempestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// OpenAI-compatible generation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL, e.g. `http://localhost:8000/v1`
    pub api_url: String,

    #[serde(default = "empty_secret", serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub api_key: Secret<String>,

    /// Default generative model
    #[serde(default = "default_generative_model")]
    pub model: String,

    /// Context window of the generative model, in tokens
    #[serde(default = "default_generative_max_context")]
    pub max_context: usize,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

/// OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL, e.g. `http://localhost:8000/v1`
    pub api_url: String,

    #[serde(default = "empty_secret", serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub api_key: Secret<String>,

    /// Default embeddings model
    #[serde(default = "default_embeddings_model")]
    pub model: String,

    /// Context window of the embeddings model, in tokens
    #[serde(default = "default_embeddings_max_context")]
    pub max_context: usize,

    /// Ask the backend's `/tokenize` endpoint for exact token counts
    #[serde(default = "default_true")]
    pub tokenize_enabled: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

/// Configuration for Qdrant vector database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Qdrant server URL
    pub url: String,

    #[serde(default, serialize_with = "serialize_optional_secret", deserialize_with = "deserialize_optional_secret")]
    pub api_key: Option<Secret<String>>,

    /// Port used when `url` carries none
    #[serde(default = "default_vectordb_port")]
    pub port: u16,

    /// Default collection searched by `/prompt`
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Consecutive failures before the circuit breaker opens
    #[serde(default = "default_breaker_failures")]
    pub breaker_failure_threshold: usize,

    /// Seconds the breaker stays open before probing again
    #[serde(default = "default_breaker_reset")]
    pub breaker_reset_secs: u64,
}

/// Retrieval and prompt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Maximum number of documents retrieved per query
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Header placed before the retrieved context
    #[serde(default = "default_prompt_header")]
    pub prompt_header: String,

    /// Replaces the built-in system prompt of the CI profiles
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_n: default_top_n(),
            prompt_header: default_prompt_header(),
            system_prompt: None,
        }
    }
}

/// Sampling defaults applied when a request omits them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Auth/session store. Read for completeness; this service never connects to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_auth_database_url", serialize_with = "serialize_secret", deserialize_with = "deserialize_secret")]
    pub auth_url: Secret<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_database_url(),
        }
    }
}

/// Tempest report analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempestConfig {
    /// Failures analysed concurrently
    #[serde(default = "default_tempest_concurrency")]
    pub max_concurrency: usize,

    /// Report download timeout in seconds
    #[serde(default = "default_timeout")]
    pub fetch_timeout_secs: u64,

    /// Largest report accepted, in MB
    #[serde(default = "default_max_report_size")]
    pub max_report_size_mb: usize,

    /// Trailing traceback characters sent to the model
    #[serde(default = "default_max_traceback_chars")]
    pub max_traceback_chars: usize,
}

impl Default for TempestConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_tempest_concurrency(),
            fetch_timeout_secs: default_timeout(),
            max_report_size_mb: default_max_report_size(),
            max_traceback_chars: default_max_traceback_chars(),
        }
    }
}

impl TempestConfig {
    /// Largest report accepted, in bytes
    pub fn max_report_size_bytes(&self) -> usize {
        self.max_report_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default = "default_server_host")]
    pub host: String,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size")]
    pub max_body_size_mb: usize,

    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            host: default_server_host(),
            max_body_size_mb: default_max_body_size(),
            rate_limit_enabled: true,
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl ServerConfig {
    /// Maximum request body size in bytes
    pub fn max_body_size_bytes(&self) -> usize {
        self.max_body_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json`, `compact` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_timeout() -> u64 { 30 }
fn default_generation_timeout() -> u64 { 120 }
fn default_generative_model() -> String { "mistralai/Mistral-7B-Instruct-v0.3".to_string() }
fn default_generative_max_context() -> usize { 32000 }
fn default_embeddings_model() -> String { "BAAI/bge-m3".to_string() }
fn default_embeddings_max_context() -> usize { 8192 }
fn default_cache_ttl() -> u64 { 3600 }
fn default_cache_size() -> usize { 1000 }
fn default_vectordb_port() -> u16 { 6334 }
fn default_collection_name() -> String { "rca-knowledge-base".to_string() }
fn default_breaker_failures() -> usize { 5 }
fn default_breaker_reset() -> u64 { 30 }
fn default_similarity_threshold() -> f64 { 0.8 }
fn default_top_n() -> usize { 5 }
fn default_prompt_header() -> String {
    "Here is the text with the information from our knowledge database:\n".to_string()
}
fn default_temperature() -> f64 { 0.7 }
fn default_max_tokens() -> u32 { 1024 }
fn default_auth_database_url() -> Secret<String> {
    Secret::new("postgresql://<username>:<password>@localhost:5432/users".to_string())
}
fn default_tempest_concurrency() -> usize { 4 }
fn default_max_report_size() -> usize { 50 }
fn default_max_traceback_chars() -> usize { 6000 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }
fn default_server_port() -> u16 { 8080 }
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_max_body_size() -> usize { 2 }
fn default_rate_limit() -> usize { 60 }
fn empty_secret() -> Secret<String> { Secret::new(String::new()) }

impl Config {
    /// Load configuration from the flat environment variables of the deployment
    pub fn from_env() -> crate::error::Result<Self> {
        let config = loader::load_from_env(None)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file with `RCA_ACCELERATOR__*` overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config_with_env(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration pointing at local backends
    pub fn default_config() -> Self {
        Self {
            generation: GenerationConfig {
                api_url: "http://localhost:8000/v1".to_string(),
                api_key: empty_secret(),
                model: default_generative_model(),
                max_context: default_generative_max_context(),
                timeout_secs: default_generation_timeout(),
            },
            embedding: EmbeddingConfig {
                api_url: "http://localhost:8000/v1".to_string(),
                api_key: empty_secret(),
                model: default_embeddings_model(),
                max_context: default_embeddings_max_context(),
                tokenize_enabled: true,
                timeout_secs: default_timeout(),
                cache_enabled: true,
                cache_ttl_secs: default_cache_ttl(),
                cache_size: default_cache_size(),
            },
            vector_db: VectorDbConfig {
                url: "http://localhost:6334".to_string(),
                api_key: None,
                port: default_vectordb_port(),
                collection_name: default_collection_name(),
                timeout_secs: default_timeout(),
                breaker_failure_threshold: default_breaker_failures(),
                breaker_reset_secs: default_breaker_reset(),
            },
            search: SearchConfig::default(),
            model_defaults: ModelDefaults::default(),
            database: DatabaseConfig::default(),
            tempest: TempestConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Custom serializer for Secret<String>
fn serialize_secret<S>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

/// Custom deserializer for Secret<String>
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Secret<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Secret::new(s))
}

fn serialize_optional_secret<S>(secret: &Option<Secret<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Empty strings count as "no key"
fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty()).map(Secret::new))
}
