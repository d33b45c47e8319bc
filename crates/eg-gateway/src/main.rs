use anyhow::Context;
use eg_gateway::{build_router, AppState, GatewayConfig};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env().context("loading configuration")?;
    let addr = config.http_addr();
    let state = AppState::build(config)?;
    let app = build_router(state);

    tracing::info!(%addr, version = eg_gateway::VERSION, "envelope gateway listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("serving")?;
    Ok(())
}
