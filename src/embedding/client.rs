//! Embedding client for OpenAI-compatible backends

use super::{models::*, EmbeddingCache, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Client for `/embeddings`, `/models` and `/tokenize`
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    http_client: Client,
    cache: Option<Arc<EmbeddingCache>>,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(EmbeddingError::NetworkError)?;

        let cache = if config.cache_enabled {
            Some(Arc::new(EmbeddingCache::new(
                config.cache_size,
                Duration::from_secs(config.cache_ttl_secs),
            )))
        } else {
            None
        };

        info!(
            "Initialized embedding client for {} with cache_enabled={}",
            config.api_url, config.cache_enabled
        );

        Ok(Self {
            config,
            http_client,
            cache,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// vLLM serves `/tokenize` at the server root, outside the `/v1` prefix
    fn tokenize_endpoint(&self) -> Result<Url> {
        let base = Url::parse(&self.config.api_url)
            .map_err(|e| EmbeddingError::ApiError(format!("invalid embeddings URL: {}", e)))?;
        base.join("/tokenize")
            .map_err(|e| EmbeddingError::ApiError(format!("invalid tokenize URL: {}", e)).into())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.config.api_key.expose_secret();
        if key.is_empty() {
            builder
        } else {
            builder.bearer_auth(key)
        }
    }

    async fn check_status(response: reqwest::Response, model: &str) -> Result<reqwest::Response> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("Embeddings backend rejected credentials");
                Err(EmbeddingError::AuthenticationFailed.into())
            }
            StatusCode::NOT_FOUND => {
                warn!("Embeddings model {} not found", model);
                Err(EmbeddingError::ModelNotFound(model.to_string()).into())
            }
            _ => {
                let error_text = response.text().await.unwrap_or_default();
                if error_text.contains("does not exist") {
                    return Err(EmbeddingError::ModelNotFound(model.to_string()).into());
                }
                error!("Embeddings request failed with status {}: {}", status, error_text);
                Err(EmbeddingError::ApiError(format!("Status {}: {}", status, error_text)).into())
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Text cannot be empty".to_string()).into());
        }

        let key = EmbeddingCache::key(model, text);
        if let Some(cache) = &self.cache {
            if let Some(embedding) = cache.get(&key).await {
                return Ok(embedding);
            }
        }

        debug!("Requesting embedding from model {}", model);
        let request = EmbeddingRequest::new(text, model);
        let response = self
            .authorized(self.http_client.post(self.endpoint("embeddings")))
            .json(&request)
            .send()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        let response: EmbeddingResponse = Self::check_status(response, model)
            .await?
            .json()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| EmbeddingError::EmptyResponse(model.to_string()))?;

        if let Some(cache) = &self.cache {
            cache.put(key, embedding.clone()).await;
        }

        Ok(embedding)
    }

    async fn count_tokens(&self, text: &str, model: &str) -> Result<usize> {
        let url = self.tokenize_endpoint()?;
        let request = TokenizeRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let response = self
            .authorized(self.http_client.post(url))
            .json(&request)
            .send()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        let response: TokenizeResponse = Self::check_status(response, model)
            .await?
            .json()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        debug!("Content is {} tokens for model {}", response.count, model);
        Ok(response.count)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorized(self.http_client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        let models: ModelList = Self::check_status(response, &self.config.model)
            .await?
            .json()
            .await
            .map_err(EmbeddingError::NetworkError)?;

        Ok(models.ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::RcaError;

    fn config_for(url: &str, cache_enabled: bool) -> EmbeddingConfig {
        let mut config = Config::default_config().embedding;
        config.api_url = format!("{}/v1", url);
        config.api_key = secrecy::Secret::new("emb-key".to_string());
        config.cache_enabled = cache_enabled;
        config
    }

    #[tokio::test]
    async fn test_embed_sends_model_and_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer emb-key")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"BAAI/bge-m3","input":"nova timeout"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.5,0.25],"index":0}],"model":"BAAI/bge-m3"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config_for(&server.url(), false)).unwrap();
        let embedding = client.embed("nova timeout", "BAAI/bge-m3").await.unwrap();

        assert_eq!(embedding, vec![0.5, 0.25]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[1.0],"index":0}]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config_for(&server.url(), true)).unwrap();
        client.embed("same text", "m").await.unwrap();
        client.embed("same text", "m").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_model_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(404)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config_for(&server.url(), false)).unwrap();
        let err = client.embed("text", "missing").await.unwrap_err();

        assert!(matches!(err, RcaError::Embedding(EmbeddingError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config_for(&server.url(), false)).unwrap();
        let err = client.embed("text", "m").await.unwrap_err();

        assert!(matches!(err, RcaError::Embedding(EmbeddingError::EmptyResponse(_))));
    }

    #[tokio::test]
    async fn test_count_tokens_hits_server_root() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tokenize")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count":42,"max_model_len":8192,"tokens":[]}"#)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config_for(&server.url(), false)).unwrap();
        assert_eq!(client.count_tokens("text", "m").await.unwrap(), 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_models() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/models")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"object":"list","data":[{"id":"BAAI/bge-m3"},{"id":"e5-large"}]}"#)
            .create_async()
            .await;

        let client = EmbeddingClient::new(config_for(&server.url(), false)).unwrap();
        assert_eq!(
            client.list_models().await.unwrap(),
            vec!["BAAI/bge-m3".to_string(), "e5-large".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client = EmbeddingClient::new(config_for("http://localhost:1", false)).unwrap();
        assert!(client.embed("   ", "m").await.is_err());
    }
}
