use anyhow::Context;

use eventhub_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eventhub_observability::init();

    let config = ApiConfig::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let services = eventhub_api::app::services::build_services(&config).await?;
    let app = eventhub_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
