//! Per-client fixed-window rate limiting for the API routes

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ServerConfig;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: usize,
    /// Time window duration
    pub window_duration: Duration,
    /// Whether to enable rate limiting
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_duration: Duration::from_secs(60),
            enabled: true,
        }
    }
}

impl From<&ServerConfig> for RateLimitConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            max_requests: server.rate_limit_per_minute,
            window_duration: Duration::from_secs(60),
            enabled: server.rate_limit_enabled,
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: usize,
    started: Instant,
}

/// Rate limiter keyed by client address
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Count one request for `client_id`, rejecting it once the window is full
    pub fn check(&self, client_id: &str) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self.windows.entry(client_id.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        let window = entry.value_mut();

        if now.duration_since(window.started) >= self.config.window_duration {
            window.count = 0;
            window.started = now;
        }

        if window.count >= self.config.max_requests {
            let retry_after = self
                .config
                .window_duration
                .saturating_sub(now.duration_since(window.started));
            return Err(RateLimitError::LimitExceeded {
                retry_after,
                limit: self.config.max_requests,
            });
        }

        window.count += 1;
        debug!("Request {}/{} for client {}", window.count, self.config.max_requests, client_id);
        Ok(())
    }

    /// Drop windows that have already expired
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < self.config.window_duration);
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.window_duration);
            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }
}

/// Rate limit error
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Retry after {retry_after:?}. Limit: {limit} requests per window")]
    LimitExceeded { retry_after: Duration, limit: usize },
}

/// Axum middleware rejecting over-limit clients with 429
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let client_id = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&client_id) {
        Ok(()) => Ok(next.run(req).await),
        Err(e) => {
            warn!("Rejecting request from {}: {}", client_id, e);
            Err(StatusCode::TOO_MANY_REQUESTS)
        }
    }
}
