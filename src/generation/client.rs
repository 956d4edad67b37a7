//! Chat completion client

use super::models::*;
use super::GenerationProvider;
use crate::config::GenerationConfig;
use crate::embedding::ModelList;
use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Phrases vLLM and OpenAI use when the prompt overflows the context window
const CONTEXT_OVERFLOW_MARKERS: &[&str] = &[
    "reduce the length of the messages or completion",
    "maximum context length",
];

/// Client for `/chat/completions` and `/models`
pub struct GenerationClient {
    config: GenerationConfig,
    http_client: Client,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(GenerationError::NetworkError)?;

        info!("Initialized generation client for {}", config.api_url);

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
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
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("Generation backend rejected credentials");
                Err(GenerationError::AuthenticationFailed.into())
            }
            StatusCode::NOT_FOUND => {
                warn!("Generative model {} not found", model);
                Err(GenerationError::ModelNotFound(model.to_string()).into())
            }
            _ if error_text.contains("does not exist") => {
                warn!("Generative model {} not found", model);
                Err(GenerationError::ModelNotFound(model.to_string()).into())
            }
            _ if CONTEXT_OVERFLOW_MARKERS.iter().any(|m| error_text.contains(m)) => {
                warn!("Prompt exceeded the context window of {}", model);
                Err(GenerationError::ContextLengthExceeded.into())
            }
            _ => {
                error!("Generation request failed with status {}: {}", status, error_text);
                Err(GenerationError::ApiError(format!("Status {}: {}", status, error_text)).into())
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for GenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            "Requesting completion from {} with {} messages",
            request.model,
            request.messages.len()
        );

        let body = ChatCompletionRequest::from(request);
        let response = self
            .authorized(self.http_client.post(self.endpoint("chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::NetworkError)?;

        let completion: ChatCompletionResponse = Self::check_status(response, &request.model)
            .await?
            .json()
            .await
            .map_err(GenerationError::NetworkError)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::EmptyResponse(request.model.clone()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorized(self.http_client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(GenerationError::NetworkError)?;

        let models: ModelList = Self::check_status(response, &self.config.model)
            .await?
            .json()
            .await
            .map_err(GenerationError::NetworkError)?;

        Ok(models.ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::RcaError;
    use mockito::Matcher;

    fn client_for(url: &str) -> GenerationClient {
        let mut config = Config::default_config().generation;
        config.api_url = format!("{}/v1", url);
        config.api_key = secrecy::Secret::new("gen-key".to_string());
        GenerationClient::new(config).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("why?")],
            model: "granite".to_string(),
            temperature: 0.5,
            max_tokens: 128,
        }
    }

    #[tokio::test]
    async fn test_generate_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer gen-key")
            .match_body(Matcher::PartialJsonString(
                r#"{"model":"granite","max_tokens":128,"stream":false}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"DNS outage"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let text = client_for(&server.url()).generate(&request()).await.unwrap();

        assert_eq!(text, "DNS outage");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server.url()).generate(&request()).await.unwrap_err();
        assert!(matches!(err, RcaError::Generation(GenerationError::EmptyResponse(_))));
    }

    #[tokio::test]
    async fn test_generate_model_does_not_exist() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body(r#"{"message":"The model `granite` does not exist."}"#)
            .create_async()
            .await;

        let err = client_for(&server.url()).generate(&request()).await.unwrap_err();
        assert!(matches!(err, RcaError::Generation(GenerationError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_generate_context_overflow() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body(r#"{"message":"This model's maximum context length is 32000 tokens"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url()).generate(&request()).await.unwrap_err();
        assert!(matches!(err, RcaError::Generation(GenerationError::ContextLengthExceeded)));
    }

    #[tokio::test]
    async fn test_generate_server_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = client_for(&server.url()).generate(&request()).await.unwrap_err();
        assert!(matches!(err, RcaError::Generation(GenerationError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_list_models() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/models")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":"granite"}]}"#)
            .create_async()
            .await;

        assert_eq!(
            client_for(&server.url()).list_models().await.unwrap(),
            vec!["granite".to_string()]
        );
    }
}
