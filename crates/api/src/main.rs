use std::sync::Arc;

use anyhow::Context;

use meditrust_api::ServiceConfig;
use meditrust_api::app::{build_app, build_services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    meditrust_observability::init();

    let config = ServiceConfig::from_env();
    let services = build_services(&config).await?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
