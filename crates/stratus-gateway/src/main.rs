use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use stratus_core::Config;
use stratus_gateway::{routes, CollectorServiceClient, GatewayState};
use stratus_store::PocketBaseClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    stratus_core::init(&config.logging)?;
    config.ensure_valid()?;

    let state = GatewayState {
        collectors: CollectorServiceClient::new(&config.gateway.collector_url)
            .context("Failed to create collector service client")?,
        store: PocketBaseClient::from_config(&config.pocketbase)
            .context("Failed to create PocketBase client")?,
    };
    tracing::info!("Collector service: {}", config.gateway.collector_url);

    let ip: IpAddr = config
        .gateway
        .host
        .parse()
        .with_context(|| format!("Invalid gateway host: {}", config.gateway.host))?;
    let addr = SocketAddr::new(ip, config.gateway.port);

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Gateway running on http://{}", bound);
    server.await;

    tracing::info!("Gateway stopped");
    Ok(())
}
