//! Health checks of the backends the service depends on

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::GenerationProvider;
use crate::vector_db::{CircuitBreaker, CircuitState, VectorStore};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl ComponentHealth {
    fn not_configured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Degraded,
            message: Some("Not configured".to_string()),
            response_time_ms: None,
        }
    }
}

/// Overall system health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
struct CachedHealth {
    result: SystemHealth,
    cached_at: Instant,
}

/// Health checker with caching
pub struct HealthChecker {
    start_time: Instant,
    vector_db: Option<Arc<dyn VectorStore>>,
    embedding_client: Option<Arc<dyn EmbeddingProvider>>,
    generation_client: Option<Arc<dyn GenerationProvider>>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    cached_result: RwLock<Option<CachedHealth>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    /// Create a new health checker with default 30-second cache TTL
    pub fn new() -> Self {
        Self::with_cache_ttl(Duration::from_secs(30))
    }

    pub fn with_cache_ttl(cache_ttl: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            vector_db: None,
            embedding_client: None,
            generation_client: None,
            circuit_breaker: None,
            cached_result: RwLock::new(None),
            cache_ttl,
        }
    }

    pub fn with_vector_db(mut self, vector_db: Arc<dyn VectorStore>) -> Self {
        self.vector_db = Some(vector_db);
        self
    }

    pub fn with_embedding_client(mut self, embedding_client: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_client = Some(embedding_client);
        self
    }

    pub fn with_generation_client(mut self, generation_client: Arc<dyn GenerationProvider>) -> Self {
        self.generation_client = Some(generation_client);
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(circuit_breaker);
        self
    }

    /// Check overall system health with caching
    pub async fn check_health(&self) -> SystemHealth {
        {
            let cached = self.cached_result.read().await;
            if let Some(cached_health) = &*cached {
                if cached_health.cached_at.elapsed() < self.cache_ttl {
                    debug!("Returning cached health check result");
                    return cached_health.result.clone();
                }
            }
        }

        let health = self.perform_health_check().await;

        *self.cached_result.write().await = Some(CachedHealth {
            result: health.clone(),
            cached_at: Instant::now(),
        });

        health
    }

    async fn perform_health_check(&self) -> SystemHealth {
        debug!("Performing fresh health check");

        let (generation, embeddings, vector_db) = tokio::join!(
            Self::probe_models("generation_service", self.generation_client.as_ref().map(|c| c.list_models())),
            Self::probe_models("embedding_service", self.embedding_client.as_ref().map(|c| c.list_models())),
            Self::probe_models("vector_database", self.vector_db.as_ref().map(|db| db.list_collections())),
        );

        let components = vec![generation, embeddings, vector_db, self.check_circuit_breaker().await];

        let status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };

        SystemHealth {
            status,
            uptime_secs: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Probe a backend by listing what it serves; an empty listing is degraded
    async fn probe_models<F>(name: &str, probe: Option<F>) -> ComponentHealth
    where
        F: Future<Output = Result<Vec<String>>>,
    {
        let Some(probe) = probe else {
            return ComponentHealth::not_configured(name);
        };

        let start = Instant::now();
        let (status, message) = match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
            Ok(Ok(items)) if items.is_empty() => (HealthStatus::Degraded, "Nothing available".to_string()),
            Ok(Ok(items)) => (HealthStatus::Healthy, format!("{} available", items.len())),
            Ok(Err(e)) => (HealthStatus::Unhealthy, e.to_string()),
            Err(_) => (HealthStatus::Unhealthy, "Health check timeout".to_string()),
        };

        ComponentHealth {
            name: name.to_string(),
            status,
            message: Some(message),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    async fn check_circuit_breaker(&self) -> ComponentHealth {
        let Some(cb) = &self.circuit_breaker else {
            return ComponentHealth::not_configured("circuit_breaker");
        };

        let (status, message) = match cb.state().await {
            CircuitState::Closed => (HealthStatus::Healthy, "Circuit closed - normal operation"),
            CircuitState::Open => (HealthStatus::Unhealthy, "Circuit open - vector store unavailable"),
            CircuitState::HalfOpen => (HealthStatus::Degraded, "Circuit half-open - testing recovery"),
        };

        ComponentHealth {
            name: "circuit_breaker".to_string(),
            status,
            message: Some(message.to_string()),
            response_time_ms: Some(0),
        }
    }

    /// Simple liveness check
    pub fn liveness(&self) -> bool {
        true
    }

    /// Ready unless a component is unhealthy
    pub async fn readiness(&self) -> bool {
        self.check_health().await.status != HealthStatus::Unhealthy
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectorDbError;
    use crate::vector_db::{CircuitBreakerConfig, ScoredDocument, SearchParams};
    use async_trait::async_trait;

    struct Store(bool);

    #[async_trait]
    impl VectorStore for Store {
        async fn search(&self, _: &str, _: SearchParams) -> Result<Vec<ScoredDocument>> {
            Ok(vec![])
        }

        async fn list_collections(&self) -> Result<Vec<String>> {
            if self.0 {
                Ok(vec!["jira".to_string()])
            } else {
                Err(VectorDbError::ConnectionError("refused".to_string()).into())
            }
        }
    }

    #[tokio::test]
    async fn test_unconfigured_is_degraded() {
        let health = HealthChecker::new().check_health().await;

        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.components.len(), 4);
    }

    #[tokio::test]
    async fn test_vector_db_down_is_unhealthy() {
        let checker = HealthChecker::new().with_vector_db(Arc::new(Store(false)));
        let health = checker.check_health().await;

        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(!checker.readiness().await);
    }

    #[tokio::test]
    async fn test_vector_db_up() {
        let checker = HealthChecker::new()
            .with_vector_db(Arc::new(Store(true)))
            .with_circuit_breaker(Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())));
        let health = checker.check_health().await;

        let db = health.components.iter().find(|c| c.name == "vector_database").unwrap();
        assert_eq!(db.status, HealthStatus::Healthy);
        let cb = health.components.iter().find(|c| c.name == "circuit_breaker").unwrap();
        assert_eq!(cb.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_liveness() {
        assert!(HealthChecker::new().liveness());
    }
}
