mod config;
mod relay;

use burrow_protocol_core::{build_registry, BaseTranslator, PacketRegistry, VersionTranslator};
use burrow_protocol_v1_20::{MappingData, V1_19_4To1_20};
use config::ProxyConfig;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Burrow proxy...");

    let config = ProxyConfig::load(Path::new("config/proxy.toml"))?;
    info!(
        "Config loaded: bind={}:{}, backend={}, unknown_recipes={:?}",
        config.bind, config.port, config.backend, config.unknown_recipes
    );

    let mappings = match &config.mappings {
        Some(path) => MappingData::load(path)?,
        None => {
            info!("No mappings configured, item and block IDs pass through unchanged");
            MappingData::identity()
        }
    };

    let layer = V1_19_4To1_20::new(mappings, config.unknown_recipes);
    let base = BaseTranslator::for_layer(&layer);
    let registry = Arc::new(build_registry(&[&base, &layer]));
    info!(
        "{} packet handlers registered, translating {} clients to {}",
        registry.handler_count(),
        layer.client_version(),
        layer.server_version()
    );

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let backend: Arc<str> = config.backend.into();
    tokio::select! {
        _ = accept_loop(listener, backend, registry) => {
            error!("Accept loop exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}

async fn accept_loop(listener: TcpListener, backend: Arc<str>, registry: Arc<PacketRegistry>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("New connection from {}", peer);
                if let Err(e) = socket.set_nodelay(true) {
                    error!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                }
                tokio::spawn(relay::handle_connection(
                    socket,
                    backend.clone(),
                    registry.clone(),
                ));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
