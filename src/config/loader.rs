//! Configuration loader with environment variable support

use super::*;
use crate::error::Result;
use config::{Environment, File};
use std::collections::HashMap;

/// Flat view of the deployment's environment variables (lowercased by `config`)
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default = "local_llm_url")]
    generation_llm_api_url: String,
    #[serde(default)]
    generation_llm_api_key: String,
    #[serde(default = "super::default_generative_model")]
    generation_llm_model_name: String,
    #[serde(default = "super::default_generative_max_context")]
    generation_llm_max_context: usize,

    #[serde(default = "local_llm_url")]
    embeddings_llm_api_url: String,
    #[serde(default)]
    embeddings_llm_api_key: String,
    #[serde(default = "super::default_embeddings_model")]
    embeddings_llm_model_name: String,
    #[serde(default = "super::default_embeddings_max_context")]
    embeddings_llm_max_context: usize,
    #[serde(default = "super::default_true")]
    embeddings_tokenize_enabled: bool,

    #[serde(default = "super::default_temperature")]
    default_model_temperature: f64,
    #[serde(default = "super::default_max_tokens")]
    default_model_max_tokens: u32,

    #[serde(default)]
    auth_database_url: Option<String>,

    #[serde(default = "local_vectordb_url")]
    vectordb_url: String,
    #[serde(default)]
    vectordb_api_key: Option<String>,
    #[serde(default = "super::default_vectordb_port")]
    vectordb_port: u16,
    #[serde(default = "super::default_collection_name")]
    vectordb_collection_name: String,

    #[serde(default = "super::default_similarity_threshold")]
    search_similarity_threshold: f64,
    #[serde(default = "super::default_top_n")]
    search_top_n: usize,
    #[serde(default = "super::default_prompt_header")]
    context_header: String,
    #[serde(default)]
    system_prompt: Option<String>,

    #[serde(default = "super::default_tempest_concurrency")]
    tempest_max_concurrency: usize,
    #[serde(default = "super::default_timeout")]
    tempest_fetch_timeout_secs: u64,

    #[serde(default = "super::default_server_host")]
    server_host: String,
    #[serde(default = "super::default_server_port")]
    server_port: u16,
    #[serde(default = "super::default_rate_limit")]
    rate_limit_per_minute: usize,

    #[serde(default = "super::default_log_level")]
    log_level: String,
    #[serde(default = "super::default_log_format")]
    log_format: String,
}

fn local_llm_url() -> String { "http://localhost:8000/v1".to_string() }
fn local_vectordb_url() -> String { "http://localhost:6334".to_string() }

impl From<EnvSettings> for Config {
    fn from(env: EnvSettings) -> Self {
        let mut config = Config::default_config();

        config.generation.api_url = env.generation_llm_api_url;
        config.generation.api_key = Secret::new(env.generation_llm_api_key);
        config.generation.model = env.generation_llm_model_name;
        config.generation.max_context = env.generation_llm_max_context;

        config.embedding.api_url = env.embeddings_llm_api_url;
        config.embedding.api_key = Secret::new(env.embeddings_llm_api_key);
        config.embedding.model = env.embeddings_llm_model_name;
        config.embedding.max_context = env.embeddings_llm_max_context;
        config.embedding.tokenize_enabled = env.embeddings_tokenize_enabled;

        config.model_defaults.temperature = env.default_model_temperature;
        config.model_defaults.max_tokens = env.default_model_max_tokens;

        if let Some(url) = env.auth_database_url {
            config.database.auth_url = Secret::new(url);
        }

        config.vector_db.url = env.vectordb_url;
        config.vector_db.api_key = env.vectordb_api_key.filter(|k| !k.is_empty()).map(Secret::new);
        config.vector_db.port = env.vectordb_port;
        config.vector_db.collection_name = env.vectordb_collection_name;

        config.search.similarity_threshold = env.search_similarity_threshold;
        config.search.top_n = env.search_top_n;
        config.search.prompt_header = env.context_header;
        config.search.system_prompt = env.system_prompt.filter(|p| !p.trim().is_empty());

        config.tempest.max_concurrency = env.tempest_max_concurrency;
        config.tempest.fetch_timeout_secs = env.tempest_fetch_timeout_secs;

        config.server.host = env.server_host;
        config.server.port = env.server_port;
        config.server.rate_limit_per_minute = env.rate_limit_per_minute;

        config.logging.level = env.log_level;
        config.logging.format = env.log_format;

        config
    }
}

/// Load configuration from flat environment variables.
///
/// `source` replaces the process environment, which keeps tests hermetic.
pub fn load_from_env(source: Option<HashMap<String, String>>) -> Result<Config> {
    let settings = config::Config::builder()
        .add_source(Environment::default().try_parsing(true).source(source))
        .build()?;

    let env: EnvSettings = settings.try_deserialize()?;
    Ok(env.into())
}

/// Load configuration from a TOML file with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let settings = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .add_source(
            Environment::with_prefix("RCA_ACCELERATOR")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
