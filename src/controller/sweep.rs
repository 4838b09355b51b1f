//! Periodic registry sweep
//!
//! Publishes every live registered model version whether or not a deployment
//! event ever mentioned it. A pass that overruns the period swallows the
//! ticks it missed; passes never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::reconcile::Context;
use crate::catalog::BuildInput;
use crate::crd::InferenceService;
use crate::publish::{PublishKey, PublishOutcome};
use crate::registry::{
    root_artifact, InferenceRecord, ModelArtifact, ModelRegistry, ModelVersion, RegisteredModel,
};
use crate::resolver::{is_live, Correlation, MatchKind};
use crate::Error;

/// Counts from one sweep pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pairs imported into the catalog for the first time
    pub imported: usize,
    /// Pairs whose stored document was refreshed
    pub refreshed: usize,
    /// Pairs or models that failed
    pub failed: usize,
}

/// Run sweeps every `period` until `cancel` fires
///
/// Returns immediately when no registry is configured.
pub async fn run_sweep(ctx: Arc<Context>, period: Duration, cancel: CancellationToken) {
    let Some(registry) = ctx.registry.clone() else {
        info!("no model registry configured, background sweep disabled");
        return;
    };

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            result = sweep_once(&ctx, registry.as_ref()) => match result {
                Ok(report) => info!(
                    imported = report.imported,
                    refreshed = report.refreshed,
                    failed = report.failed,
                    "registry sweep complete"
                ),
                Err(e) => warn!(error = %e, "registry sweep aborted"),
            },
        }
    }

    info!("background sweep stopped");
}

/// One pass over every live model version
///
/// Listing models or inference records failing aborts the pass. Anything
/// failing for a single model or version is logged and counted.
#[instrument(skip_all)]
pub async fn sweep_once(ctx: &Context, registry: &dyn ModelRegistry) -> Result<SweepReport, Error> {
    let models = registry.list_registered_models().await?;
    let records = registry.list_inference_records().await?;
    let mut report = SweepReport::default();

    for model in models.into_iter().filter(|m| is_live(m.state)) {
        let versions = match registry.list_model_versions(&model.id).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!(model = %model.name, error = %e, "listing model versions failed");
                report.failed += 1;
                continue;
            }
        };

        let artifact = match root_artifact(registry, &model).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(model = %model.name, error = %e, "fetching root artifact failed");
                report.failed += 1;
                continue;
            }
        };

        for version in versions.into_iter().filter(|v| is_live(v.state)) {
            let version_name = version.name.clone();
            match publish_version(ctx, registry, &model, version, artifact.clone(), &records).await {
                Ok(PublishOutcome::Imported(_)) => report.imported += 1,
                Ok(PublishOutcome::AlreadyImported) => report.refreshed += 1,
                Err(e) => {
                    warn!(model = %model.name, version = %version_name, error = %e, "publishing model version failed");
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}

async fn publish_version(
    ctx: &Context,
    registry: &dyn ModelRegistry,
    model: &RegisteredModel,
    version: ModelVersion,
    artifact: Option<ModelArtifact>,
    records: &[InferenceRecord],
) -> Result<PublishOutcome, Error> {
    let record = records
        .iter()
        .find(|r| {
            r.registered_model_id == model.id
                && r.model_version_id.as_deref() == Some(version.id.as_str())
                && r.is_deployed()
        })
        .cloned();

    let deployment = match &record {
        Some(record) => live_deployment(ctx, registry, record).await?,
        None => None,
    };

    let correlation = Correlation {
        model: model.clone(),
        version,
        artifact,
        record,
        kind: MatchKind::Enumerated,
    };

    let entity = ctx.builder.build(BuildInput {
        deployment: deployment.as_ref(),
        correlation: Some(&correlation),
    })?;
    ctx.publisher
        .publish(&PublishKey::for_correlation(&correlation), &entity)
        .await
}

/// The deployment an inference record points at, if it is still running
async fn live_deployment(
    ctx: &Context,
    registry: &dyn ModelRegistry,
    record: &InferenceRecord,
) -> Result<Option<InferenceService>, Error> {
    let Some(runtime) = record.runtime.as_deref().filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    let env = match registry
        .get_serving_environment(&record.serving_environment_id)
        .await
    {
        Ok(env) => env,
        Err(e) if e.is_malformed() => {
            debug!(record = %record.id, error = %e, "serving environment unavailable");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    ctx.deployments.get(&env.name, runtime).await
}
