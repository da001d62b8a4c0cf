//! Web server command handler

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{info, warn};

use crate::api;
use crate::config::Config;

pub async fn cmd_serve(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("usergate v{} starting...", env!("CARGO_PKG_VERSION"));

    if !config.server.enabled {
        warn!("Web server disabled in config ([server] enabled = false); nothing to do");
        return Ok(());
    }

    if !config.server.secure_cookies {
        warn!("Session cookies are sent without the Secure flag");
    }

    let addr = config.listen_address();
    let state = api::create_app_state_from_config(config, prometheus_handle).await?;

    if state.credentials().is_empty().await? {
        info!("No users yet: the first account can be created at /user/create without signing in");
    }

    let app = api::router(state).await?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
