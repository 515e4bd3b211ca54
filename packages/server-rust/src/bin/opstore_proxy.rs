//! opstore-proxy: HTTP ingress serving cached, tenant-scoped datasource
//! lookups from the storage service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use opstore_server::network::NetworkModule;
use opstore_server::opstorage::OpStorage;
use opstore_server::service::{DatasourceCache, DatasourceSource, DatasourceStore};
use opstore_server::storage::CacheSweeper;
use opstore_server::{LogFormat, ProxyConfig};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProxyConfig::parse();
    init_tracing(config.log_format);

    if let Some(port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(port, "metrics endpoint listening");
    }

    let storage = OpStorage::new(&config.storage()).context("invalid storage configuration")?;
    let store: Arc<dyn DatasourceSource> = Arc::new(DatasourceStore::new(storage));
    let datasources = Arc::new(DatasourceCache::new(store, config.cache()));

    let mut sweeper = config
        .sweep_interval()
        .map(|interval| CacheSweeper::start(vec![datasources.purgeable()], interval));

    let mut network = NetworkModule::new(config.network(), Arc::clone(&datasources));
    network.start().await?;
    info!(storage = %config.storage_base_url, "opstore-proxy ready");

    let result = network.serve(shutdown_signal()).await;

    if let Some(sweeper) = sweeper.as_mut() {
        sweeper.stop().await;
    }
    result
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
