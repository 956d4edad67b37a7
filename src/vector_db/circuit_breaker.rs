//! Circuit breaker for vector database operations

use crate::config::VectorDbConfig;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,

    /// Requests are rejected without reaching Qdrant
    Open,

    /// A probe request is allowed through
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: usize,

    /// Successes in half-open state that close it again
    pub success_threshold: usize,

    /// Time the circuit stays open before a probe
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&VectorDbConfig> for CircuitBreakerConfig {
    fn from(config: &VectorDbConfig) -> Self {
        Self {
            failure_threshold: config.breaker_failure_threshold,
            timeout: Duration::from_secs(config.breaker_reset_secs),
            ..Default::default()
        }
    }
}

/// Circuit breaker shared by all vector store calls
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    success_count: AtomicUsize,
    opened_at: RwLock<Option<Instant>>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejected: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            success_count: AtomicUsize::new(0),
            opened_at: RwLock::new(None),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    /// Check if request should be allowed
    pub async fn allow_request(&self) -> bool {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let state = *self.state.read().await;
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .read()
                    .await
                    .map(|at| at.elapsed() >= self.config.timeout)
                    .unwrap_or(true);

                if elapsed {
                    *self.state.write().await = CircuitState::HalfOpen;
                    self.success_count.store(0, Ordering::Relaxed);
                    debug!("Vector store circuit half-open, probing");
                    true
                } else {
                    self.total_rejected.fetch_add(1, Ordering::Relaxed);
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let state = *self.state.read().await;
        match state {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold {
                    *self.state.write().await = CircuitState::Closed;
                    self.failure_count.store(0, Ordering::Relaxed);
                    self.success_count.store(0, Ordering::Relaxed);
                    debug!("Vector store circuit closed");
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        let state = *self.state.read().await;
        match state {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.config.failure_threshold {
                    self.open().await;
                    warn!("Vector store circuit opened after {} failures", failures);
                }
            }
            CircuitState::HalfOpen => {
                self.open().await;
                warn!("Vector store circuit reopened after failed probe");
            }
            CircuitState::Open => {}
        }
    }

    async fn open(&self) {
        *self.state.write().await = CircuitState::Open;
        *self.opened_at.write().await = Some(Instant::now());
        self.success_count.store(0, Ordering::Relaxed);
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    pub async fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: *self.state.read().await,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            current_failures: self.failure_count.load(Ordering::Relaxed),
        }
    }

    /// Prometheus gauges and counters (state: 0=closed, 1=half-open, 2=open)
    pub async fn export_prometheus(&self, name: &str) -> String {
        let stats = self.stats().await;
        let state_value = match stats.state {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        };

        format!(
            "# HELP {n}_state Circuit breaker state (0=closed, 1=half-open, 2=open)\n\
             # TYPE {n}_state gauge\n\
             {n}_state {}\n\
             # HELP {n}_calls_total Calls through the circuit breaker\n\
             # TYPE {n}_calls_total counter\n\
             {n}_calls_total {}\n\
             # HELP {n}_failures_total Failed calls\n\
             # TYPE {n}_failures_total counter\n\
             {n}_failures_total {}\n\
             # HELP {n}_rejected_total Calls rejected while open\n\
             # TYPE {n}_rejected_total counter\n\
             {n}_rejected_total {}\n",
            state_value,
            stats.total_calls,
            stats.total_failures,
            stats.total_rejected,
            n = name
        )
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejected: u64,
    pub current_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: usize, timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: failures,
            success_threshold: 1,
            timeout,
        })
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let cb = breaker(3, Duration::from_secs(1));
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(cb.allow_request().await);
    }

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let cb = breaker(3, Duration::from_secs(60));

        for _ in 0..3 {
            cb.record_failure().await;
        }

        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.allow_request().await);
        assert_eq!(cb.stats().await.total_rejected, 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(2, Duration::from_secs(60));

        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_probe_recovers() {
        let cb = breaker(1, Duration::from_millis(50));

        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cb.allow_request().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_reopens() {
        let cb = breaker(1, Duration::from_millis(50));

        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cb.allow_request().await);

        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.allow_request().await);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let cb = breaker(1, Duration::from_secs(60));
        cb.record_failure().await;

        let text = cb.export_prometheus("rca_vectordb_breaker").await;
        assert!(text.contains("rca_vectordb_breaker_state 2"));
        assert!(text.contains("rca_vectordb_breaker_failures_total 1"));
    }
}
