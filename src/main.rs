use anyhow::Context;
use clap::Parser;
use log_analyzer::{
    api::{build_router, AppState},
    config::Config,
    messaging::{NatsTaskSource, TaskBridge},
    search::AnalyzerService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Test log indexing and failure classification service
#[derive(Debug, Parser)]
#[command(name = "log-analyzer", version, about)]
struct Args {
    /// Configuration file, layered over the built-in defaults
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/default.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load_from(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;

    init_tracing(&config);

    tracing::info!("Starting log analyzer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(hosts = ?config.backend.hosts, "Search backend");

    if config.observability.prometheus_enabled {
        if let Err(e) = log_analyzer::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    let service = Arc::new(
        AnalyzerService::new(&config.backend, config.search.clone())
            .context("invalid search configuration")?,
    );

    if !service.healthy().await {
        tracing::warn!("Search backend is not reachable yet; /health will report DOWN");
    }

    let shutdown = CancellationToken::new();

    let bridge_handle = if config.messaging.enabled {
        let source = NatsTaskSource::connect(&config.messaging)
            .await
            .context("failed to start task bridge")?;
        let bridge = TaskBridge::new(service.clone(), &config.messaging);
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = bridge.run(source, token).await {
                tracing::error!("Task bridge error: {}", e);
            }
        }))
    } else {
        tracing::info!("Task bridge disabled in configuration");
        None
    };

    let state = AppState::new(service)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs));
    let app = build_router(state);

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;
    tracing::info!("HTTP API server listening on http://{}", http_addr);

    let token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
                _ = token.cancelled() => {}
            }
            token.cancel();
        })
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down gracefully...");
    shutdown.cancel();
    if let Some(handle) = bridge_handle {
        if let Err(e) = handle.await {
            tracing::error!("Task bridge panicked: {}", e);
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "log_analyzer={},tower_http=info",
            config.observability.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
