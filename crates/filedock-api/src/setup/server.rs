//! Listener, startup summary and graceful shutdown

use anyhow::{Context, Result};
use axum::Router;
use filedock_core::{format_file_size, Config, FileCategory};

pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("{}:{}", config.server_host(), config.server_port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        storage_backend = %config.storage_backend(),
        naming_strategy = ?config.naming_strategy(),
        limits = %upload_limits(config),
        "Accepting uploads"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = shutdown_requested().await;
            tracing::info!(signal, "Shutdown requested, draining in-flight requests");
        })
        .await
        .context("Server terminated unexpectedly")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Per-category ceilings as `IMAGE=10 MB,VIDEO=100 MB,...`.
fn upload_limits(config: &Config) -> String {
    let policy = config.policy();
    FileCategory::ALL
        .iter()
        .map(|category| {
            format!(
                "{}={}",
                category,
                format_file_size(policy.max_file_size(*category))
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolves with the name of the first termination signal received. A signal
/// whose handler cannot be installed is logged and never fires.
async fn shutdown_requested() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
