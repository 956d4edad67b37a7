//! Configuration validation

use super::*;
use crate::error::{RcaError, Result};
use crate::middleware::InputValidator;

/// Largest accepted report or request body size, in megabytes
pub const MAX_SIZE_MB: usize = 1024;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_generation_config(&config.generation)?;
    validate_embedding_config(&config.embedding)?;
    validate_vector_db_config(&config.vector_db)?;
    validate_search_config(&config.search)?;
    validate_model_defaults(&config.model_defaults)?;
    validate_tempest_config(&config.tempest)?;
    validate_server_config(&config.server)?;
    Ok(())
}

fn validate_http_url(name: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(RcaError::Config(format!("{} URL cannot be empty", name)));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(RcaError::Config(format!(
            "{} URL must start with http:// or https://",
            name
        )));
    }

    Ok(())
}

fn validate_timeout(name: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(RcaError::Config(format!("{} timeout must be greater than 0", name)));
    }

    if secs > 600 {
        return Err(RcaError::Config(format!(
            "{} timeout too large (max: 600 seconds)",
            name
        )));
    }

    Ok(())
}

fn validate_generation_config(config: &GenerationConfig) -> Result<()> {
    validate_http_url("Generation API", &config.api_url)?;
    validate_timeout("Generation", config.timeout_secs)?;

    if config.model.trim().is_empty() {
        return Err(RcaError::Config("Generative model name cannot be empty".to_string()));
    }

    if config.max_context == 0 {
        return Err(RcaError::Config(
            "Generative model max context must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_embedding_config(config: &EmbeddingConfig) -> Result<()> {
    validate_http_url("Embeddings API", &config.api_url)?;
    validate_timeout("Embeddings", config.timeout_secs)?;

    if config.model.trim().is_empty() {
        return Err(RcaError::Config("Embeddings model name cannot be empty".to_string()));
    }

    if config.max_context == 0 {
        return Err(RcaError::Config(
            "Embeddings model max context must be greater than 0".to_string(),
        ));
    }

    if config.cache_enabled && (config.cache_size == 0 || config.cache_ttl_secs == 0) {
        return Err(RcaError::Config(
            "Cache size and TTL must be greater than 0 when cache is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_vector_db_config(config: &VectorDbConfig) -> Result<()> {
    validate_http_url("Vector database", &config.url)?;
    validate_timeout("Database", config.timeout_secs)?;

    if config.port == 0 {
        return Err(RcaError::Config("Vector database port cannot be 0".to_string()));
    }

    if config.collection_name.trim().is_empty() {
        return Err(RcaError::Config("Default collection name cannot be empty".to_string()));
    }

    if config.breaker_failure_threshold == 0 {
        return Err(RcaError::Config(
            "Circuit breaker failure threshold must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<()> {
    InputValidator::validate_similarity_threshold(config.similarity_threshold)
        .map_err(|e| RcaError::Config(format!("Default similarity {}", e)))?;

    if config.top_n == 0 || config.top_n > 100 {
        return Err(RcaError::Config("Search top_n must be between 1 and 100".to_string()));
    }

    Ok(())
}

fn validate_model_defaults(config: &ModelDefaults) -> Result<()> {
    InputValidator::validate_temperature(config.temperature)
        .map_err(|e| RcaError::Config(format!("Default {}", e)))?;
    InputValidator::validate_max_tokens(config.max_tokens)
        .map_err(|e| RcaError::Config(format!("Default {}", e)))?;
    Ok(())
}

fn validate_tempest_config(config: &TempestConfig) -> Result<()> {
    validate_timeout("Tempest fetch", config.fetch_timeout_secs)?;

    if config.max_concurrency == 0 || config.max_concurrency > 64 {
        return Err(RcaError::Config(
            "Tempest max concurrency must be between 1 and 64".to_string(),
        ));
    }

    if config.max_report_size_mb == 0 || config.max_report_size_mb > MAX_SIZE_MB {
        return Err(RcaError::Config(format!(
            "Tempest max report size must be between 1 and {} MB",
            MAX_SIZE_MB
        )));
    }

    if config.max_traceback_chars == 0 {
        return Err(RcaError::Config(
            "Tempest max traceback length must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate server configuration
pub fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(RcaError::Config("Server port cannot be 0".to_string()));
    }

    if config.host.is_empty() {
        return Err(RcaError::Config("Server host cannot be empty".to_string()));
    }

    if config.max_body_size_mb == 0 || config.max_body_size_mb > MAX_SIZE_MB {
        return Err(RcaError::Config(format!(
            "Max body size must be between 1 and {} MB",
            MAX_SIZE_MB
        )));
    }

    if config.rate_limit_enabled && config.rate_limit_per_minute == 0 {
        return Err(RcaError::Config(
            "Rate limit must be greater than 0 when enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default_config()).is_ok());
    }

    #[test]
    fn test_invalid_generation_url() {
        let mut config = Config::default_config();
        config.generation.api_url = "localhost:8000".to_string();
        assert!(validate_generation_config(&config.generation).is_err());
    }

    #[test]
    fn test_default_temperature_out_of_range() {
        let mut config = Config::default_config();
        config.model_defaults.temperature = 0.0;
        assert!(validate_model_defaults(&config.model_defaults).is_err());
    }

    #[test]
    fn test_default_max_tokens_out_of_range() {
        let mut config = Config::default_config();
        config.model_defaults.max_tokens = 2048;
        assert!(validate_model_defaults(&config.model_defaults).is_err());
    }

    #[test]
    fn test_default_threshold_out_of_range() {
        let mut config = Config::default_config();
        config.search.similarity_threshold = 1.5;
        assert!(validate_search_config(&config.search).is_err());
    }

    #[test]
    fn test_zero_tempest_concurrency() {
        let mut config = Config::default_config();
        config.tempest.max_concurrency = 0;
        assert!(validate_tempest_config(&config.tempest).is_err());
    }

    #[test]
    fn test_size_limits_bounded() {
        let mut config = Config::default_config();
        config.tempest.max_report_size_mb = usize::MAX;
        assert!(validate_tempest_config(&config.tempest).is_err());
        config.tempest.max_report_size_mb = MAX_SIZE_MB;
        assert!(validate_tempest_config(&config.tempest).is_ok());

        config.server.max_body_size_mb = usize::MAX;
        assert!(validate_server_config(&config.server).is_err());
        config.server.max_body_size_mb = MAX_SIZE_MB;
        assert!(validate_server_config(&config.server).is_ok());
    }

    #[test]
    fn test_size_in_bytes_saturates() {
        let mut config = Config::default_config();
        config.tempest.max_report_size_mb = usize::MAX;
        config.server.max_body_size_mb = 2;

        assert_eq!(config.tempest.max_report_size_bytes(), usize::MAX);
        assert_eq!(config.server.max_body_size_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_zero_vectordb_port() {
        let mut config = Config::default_config();
        config.vector_db.port = 0;
        assert!(validate_vector_db_config(&config.vector_db).is_err());
    }
}
