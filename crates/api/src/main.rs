use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use cloudrelay_api::app::AppServices;
use cloudrelay_api::config::ReceiverConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ReceiverConfig::parse();
    cloudrelay_observability::init_with(config.log_format());

    let services = Arc::new(AppServices::default());
    tracing::info!(
        count = services.dispatcher.registry().len(),
        event_types = ?services.dispatcher.registry().type_keys(),
        "decoders registered"
    );
    let app = cloudrelay_api::app::build_app_with(services);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
