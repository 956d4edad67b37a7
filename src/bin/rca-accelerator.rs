//! RCA Accelerator server binary
//!
//! Loads configuration, wires the backends into the prompt pipeline and the
//! Tempest analyzer, and serves the HTTP API until Ctrl+C or SIGTERM.

use anyhow::Context;
use rca_accelerator::{
    api::{build_router, AppState},
    config::Config,
    embedding::{EmbeddingClient, EmbeddingProvider},
    generation::{GenerationClient, GenerationProvider},
    middleware::{RateLimitConfig, RateLimiter},
    observability::{init_observability, HealthChecker, MetricsCollector},
    rag::RcaPipeline,
    shutdown::ShutdownCoordinator,
    tempest::TempestAnalyzer,
    vector_db::{VectorDbClient, VectorStore},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let (config, source) = match std::env::var("CONFIG_PATH") {
        Ok(path) => (
            Config::from_file_with_env(&path).with_context(|| format!("loading {}", path))?,
            path,
        ),
        Err(_) => (
            Config::from_env().context("loading configuration from environment")?,
            "environment".to_string(),
        ),
    };
    let config = Arc::new(config);

    init_observability(&config.logging.level, &config.logging.format);
    info!("Starting RCA Accelerator");
    info!("Configuration loaded and validated from {}", source);

    let metrics = Arc::new(MetricsCollector::new());

    let embedding_client: Arc<dyn EmbeddingProvider> =
        Arc::new(EmbeddingClient::new(config.embedding.clone())?);
    info!("Embedding client initialized for model {}", config.embedding.model);

    let generation_client: Arc<dyn GenerationProvider> =
        Arc::new(GenerationClient::new(config.generation.clone())?);
    info!("Generation client initialized for model {}", config.generation.model);

    let qdrant = VectorDbClient::new(&config.vector_db)?;
    let circuit_breaker = qdrant.breaker();
    let vector_db: Arc<dyn VectorStore> = Arc::new(qdrant);
    info!("Vector database client initialized");

    let pipeline = Arc::new(
        RcaPipeline::new(
            Arc::clone(&config),
            Arc::clone(&embedding_client),
            Arc::clone(&generation_client),
            Arc::clone(&vector_db),
        )
        .with_metrics(Arc::clone(&metrics)),
    );

    let analyzer = Arc::new(
        TempestAnalyzer::new(Arc::clone(&pipeline), config.tempest.clone())?
            .with_metrics(Arc::clone(&metrics)),
    );
    info!(
        "Tempest analyzer initialized with concurrency {}",
        config.tempest.max_concurrency
    );

    let health_checker = Arc::new(
        HealthChecker::new()
            .with_vector_db(Arc::clone(&vector_db))
            .with_embedding_client(Arc::clone(&embedding_client))
            .with_generation_client(Arc::clone(&generation_client))
            .with_circuit_breaker(Arc::clone(&circuit_breaker)),
    );
    info!("Health checker initialized");

    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.server)));
    let cleanup = Arc::clone(&rate_limiter).start_cleanup_task();
    info!(
        "Rate limiter initialized (enabled: {}, {} requests per minute)",
        config.server.rate_limit_enabled, config.server.rate_limit_per_minute
    );

    let app_state = AppState {
        pipeline,
        analyzer,
        health_checker,
        metrics,
        circuit_breaker: Some(circuit_breaker),
    };
    let app = build_router(app_state, rate_limiter, config.server.max_body_size_bytes());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on {}", addr);

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let shutdown = coordinator.subscribe();
    tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.wait_for_signal().await }
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.wait())
    .await?;

    cleanup.abort();
    info!("Server shutdown complete");

    Ok(())
}
