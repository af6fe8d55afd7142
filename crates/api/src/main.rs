use anyhow::Context;

use incidents_api::app;
use incidents_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    incidents_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = app::services::build_services(&config).await?;
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
