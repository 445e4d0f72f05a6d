use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http_metrics::api::routes::create_router;
use http_metrics::config::Config;
use http_metrics::metrics::{BuildInfo, HttpMetrics, MetricsSchema};
use http_metrics::middleware::MetricsMiddleware;

/// Resolves on Ctrl+C or SIGTERM. A signal that cannot be installed is
/// logged and never fires, leaving the other one in charge.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    info!(signal = received, "Draining connections before exit");
}

/// Package name and version, plus git details when the build environment
/// exports `GIT_BRANCH`, `GIT_TAG` or `GIT_COMMIT`.
fn build_info() -> BuildInfo {
    let mut build = BuildInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if let Some(branch) = option_env!("GIT_BRANCH") {
        build = build.branch(branch);
    }
    if let Some(tag) = option_env!("GIT_TAG") {
        build = build.tag(tag);
    }
    if let Some(commit) = option_env!("GIT_COMMIT") {
        build = build.commit(commit);
    }
    build
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,http_metrics=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HTTP metrics demo v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let mut schema = if config.metrics.host_label {
        MetricsSchema::default()
    } else {
        MetricsSchema::single_tenant()
    };
    schema = schema
        .namespace(config.metrics.namespace.clone())
        .build_info(build_info());

    let metrics = HttpMetrics::new(schema)
        .and_then(HttpMetrics::with_process_collector)
        .context("Failed to register metrics")?;
    let middleware = MetricsMiddleware::new(Arc::new(metrics), config.metrics_options());

    let app = create_router(middleware);

    let addr = config.server_address();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    info!("Server listening on {}", addr);

    // Peer addresses feed the metrics allow list
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
