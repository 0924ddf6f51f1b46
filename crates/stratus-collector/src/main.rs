use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use stratus_collector::{routes, AppState, CollectorManager, SamplePipeline};
use stratus_core::Config;
use stratus_store::PocketBaseClient;
use stratus_weather::WeatherSource;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    stratus_core::init(&config.logging)?;
    config.ensure_valid()?;

    let source =
        WeatherSource::from_config(&config.weather).context("Failed to create weather source")?;
    let store = PocketBaseClient::from_config(&config.pocketbase)
        .context("Failed to create PocketBase client")?;
    tracing::info!("Document store: {}", config.pocketbase.url);

    let pipeline = Arc::new(SamplePipeline::new(source, store));
    let manager = Arc::new(CollectorManager::new(
        pipeline,
        config.collector.discard_after_stop,
    ));

    let ip: IpAddr = config
        .collector
        .host
        .parse()
        .with_context(|| format!("Invalid collector host: {}", config.collector.host))?;
    let addr = SocketAddr::new(ip, config.collector.port);

    let (bound, server) = warp::serve(routes(AppState::new(Arc::clone(&manager))))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Collector service running on http://{}", bound);
    server.await;

    tracing::info!("Shutting down collector service");
    manager.shutdown();

    Ok(())
}
