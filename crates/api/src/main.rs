use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use retone_infra::RetoneConfig;
use retone_infra::external::MistralGenerator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    retone_observability::init();

    let config = RetoneConfig::from_env().context("invalid configuration")?;
    let generator = MistralGenerator::new(&config.mistral).context("cannot build mistral client")?;
    info!(model = generator.model(), "generator ready");

    let coordinator = retone_api::app::services::build_coordinator(&config, Arc::new(generator))
        .await
        .context("cannot open result store")?;

    let app = retone_api::app::build_app(coordinator.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped accepting connections, draining jobs");
    coordinator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
