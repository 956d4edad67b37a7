//! Qdrant client implementation

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::models::{ScoredDocument, SearchParams};
use super::VectorStore;
use crate::config::VectorDbConfig;
use crate::error::{Result, VectorDbError};
use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{PointId, SearchPointsBuilder, Value};
use qdrant_client::Qdrant;
use reqwest::Url;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Client for Qdrant vector database
pub struct VectorDbClient {
    client: Qdrant,
    breaker: Arc<CircuitBreaker>,
}

impl VectorDbClient {
    /// Create a new vector database client
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let url = endpoint_with_port(&config.url, config.port)?;
        info!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(&url)
            .api_key(config.api_key.as_ref().map(|k| k.expose_secret().clone()))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorDbError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::from(config))),
        })
    }

    /// Circuit breaker guarding this client
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    /// Run `op` through the circuit breaker
    async fn guarded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, qdrant_client::QdrantError>>,
    {
        if !self.breaker.allow_request().await {
            return Err(VectorDbError::ServiceUnavailable(
                "circuit breaker is open".to_string(),
            )
            .into());
        }

        match op.await {
            Ok(value) => {
                self.breaker.record_success().await;
                Ok(value)
            }
            Err(e) => {
                self.breaker.record_failure().await;
                error!("Qdrant call failed: {}", e);
                Err(VectorDbError::ConnectionError(e.to_string()).into())
            }
        }
    }
}

/// Apply `port` when the URL does not carry one
fn endpoint_with_port(url: &str, port: u16) -> Result<String> {
    let mut parsed = Url::parse(url)
        .map_err(|e| VectorDbError::ConnectionError(format!("invalid Qdrant URL {}: {}", url, e)))?;

    if parsed.port().is_none() {
        parsed
            .set_port(Some(port))
            .map_err(|_| VectorDbError::ConnectionError(format!("cannot set port on {}", url)))?;
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Num(num)) => num.to_string(),
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        None => String::new(),
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        Kind::IntegerValue(i) => Some(i.to_string()),
        Kind::DoubleValue(d) => Some(d.to_string()),
        Kind::BoolValue(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_list(value: &Value) -> Vec<String> {
    match value.kind.as_ref() {
        Some(Kind::ListValue(list)) => list.values.iter().filter_map(value_to_string).collect(),
        _ => value_to_string(value).into_iter().collect(),
    }
}

/// Build a document from a point payload; missing fields stay empty
fn parse_document(
    id: Option<PointId>,
    score: f32,
    payload: &HashMap<String, Value>,
    collection: &str,
) -> ScoredDocument {
    ScoredDocument {
        id: point_id_to_string(id),
        score,
        url: payload.get("url").and_then(value_to_string),
        kind: payload.get("kind").and_then(value_to_string),
        text: payload.get("text").and_then(value_to_string),
        components: payload.get("components").map(value_to_list).unwrap_or_default(),
        collection: collection.to_string(),
    }
}

#[async_trait]
impl VectorStore for VectorDbClient {
    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<ScoredDocument>> {
        debug!(
            "Searching in collection: {} with limit: {} threshold: {}",
            collection, params.limit, params.score_threshold
        );

        let request = SearchPointsBuilder::new(collection, params.vector, params.limit as u64)
            .with_payload(true)
            .score_threshold(params.score_threshold);

        let response = self.guarded(self.client.search_points(request)).await?;

        let documents: Vec<ScoredDocument> = response
            .result
            .into_iter()
            .map(|point| parse_document(point.id, point.score, &point.payload, collection))
            .collect();

        debug!("Found {} results", documents.len());
        Ok(documents)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.guarded(self.client.list_collections()).await?;

        let mut names: Vec<String> = Vec::with_capacity(response.collections.len());
        for collection in response.collections {
            if !names.contains(&collection.name) {
                names.push(collection.name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_applied_when_missing() {
        assert_eq!(
            endpoint_with_port("http://qdrant.local", 6334).unwrap(),
            "http://qdrant.local:6334"
        );
    }

    #[test]
    fn test_explicit_port_wins() {
        assert_eq!(
            endpoint_with_port("http://qdrant.local:7000", 6334).unwrap(),
            "http://qdrant.local:7000"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(endpoint_with_port("not a url", 6334).is_err());
    }

    #[test]
    fn test_parse_document_payload() {
        let mut payload = HashMap::new();
        payload.insert("url".to_string(), Value::from("https://issues.example.com/OSP-1"));
        payload.insert("kind".to_string(), Value::from("comment"));
        payload.insert("text".to_string(), Value::from("neutron agent down"));
        payload.insert(
            "components".to_string(),
            Value::from(vec![Value::from("neutron"), Value::from("ovn")]),
        );

        let doc = parse_document(Some(PointId::from(7u64)), 0.91, &payload, "jira");

        assert_eq!(doc.id, "7");
        assert_eq!(doc.url.as_deref(), Some("https://issues.example.com/OSP-1"));
        assert_eq!(doc.kind.as_deref(), Some("comment"));
        assert_eq!(doc.components, vec!["neutron".to_string(), "ovn".to_string()]);
        assert_eq!(doc.collection, "jira");
    }

    #[test]
    fn test_parse_document_missing_fields() {
        let doc = parse_document(None, 0.5, &HashMap::new(), "errata");
        assert!(doc.url.is_none());
        assert!(doc.text.is_none());
        assert!(doc.components.is_empty());
    }

    // Requires Qdrant running
    #[tokio::test]
    #[ignore]
    async fn test_list_collections_live() {
        let config = crate::config::Config::default_config().vector_db;
        let client = VectorDbClient::new(&config).unwrap();
        assert!(client.list_collections().await.is_ok());
    }
}
