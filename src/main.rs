//! Model normalizer - catalog publisher for served models

use std::sync::Arc;

use clap::Parser;
use kube::Client;
use tokio_util::sync::CancellationToken;

use model_normalizer::config::Config;
use model_normalizer::controller::{self, run_sweep, Context};
use model_normalizer::publish::{HttpCatalogImporter, HttpStorageTier, Publisher};
use model_normalizer::registry::{ModelRegistry, RegistryClient};
use model_normalizer::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    init_telemetry(TelemetryConfig {
        log_format: config.log_format,
        ..Default::default()
    })?;

    let result = run(config).await;
    shutdown_telemetry();
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Kubernetes client: {}", e))?;

    let storage = HttpStorageTier::new(&config.storage_url, config.http_timeout())?;
    let importer = HttpCatalogImporter::new(
        &config.catalog_url,
        config.catalog_token.clone(),
        config.http_timeout(),
    )?;
    let publisher = Arc::new(Publisher::new(
        Arc::new(storage),
        Arc::new(importer),
        &config.storage_url,
    ));

    let mut builder =
        Context::builder(client.clone(), publisher).settings(config.normalizer_settings());
    match config.registry_url() {
        Some(url) => {
            let registry: Arc<dyn ModelRegistry> = Arc::new(RegistryClient::new(
                url,
                config.registry_token.clone(),
                config.http_timeout(),
            )?);
            tracing::info!(registry = %url, "model registry correlation enabled");
            builder = builder.registry(registry);
        }
        None => tracing::warn!("no model registry configured, publishing deployments only"),
    }
    let ctx = Arc::new(builder.build());

    let cancel = CancellationToken::new();
    let sweep = tokio::spawn(run_sweep(
        ctx.clone(),
        config.sweep_interval(),
        cancel.clone(),
    ));

    tracing::info!(
        storage = %config.storage_url,
        catalog = %config.catalog_url,
        format = ?config.format,
        "model normalizer started"
    );
    controller::run(client, ctx, config.concurrency).await;

    cancel.cancel();
    if let Err(e) = sweep.await {
        tracing::warn!(error = %e, "background sweep task ended abnormally");
    }
    tracing::info!("model normalizer shut down");
    Ok(())
}
