use std::sync::Arc;

use anyhow::Context;

use autoflex_api::app::{AppServices, build_app};
use autoflex_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autoflex_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize catalog store")?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
