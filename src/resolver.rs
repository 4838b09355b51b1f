//! Correlation of a live deployment with the registry records describing it
//!
//! The deployment carries no reference to the registry, so the link is
//! inferred in two tiers:
//!
//! 1. **Direct graph match**: a DEPLOYED inference record of some registered
//!    model whose `runtime` prefixes the deployment name and whose serving
//!    environment is named after the deployment's namespace.
//! 2. **Name-pattern fallback**: the deployment is named
//!    `<model>-<version>` after KServe-style sanitization.
//!
//! Archived models and versions never match. When several models collide on
//! the fallback path the first one in registry order wins.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::registry::{
    root_artifact, InferenceRecord, ModelArtifact, ModelRegistry, ModelVersion, RecordState,
    RegisteredModel,
};
use crate::sanitize::{deployment_name_for, sanitize_lower};
use crate::Error;

/// How a correlation was established
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    /// Through an inference record and its serving environment
    DirectGraph,
    /// Through the `<model>-<version>` naming convention
    NamePattern,
    /// Enumerated by the background sweep, not matched to a deployment
    Enumerated,
}

/// Registry records describing one logical deployment
#[derive(Clone, Debug, PartialEq)]
pub struct Correlation {
    /// Registered model
    pub model: RegisteredModel,
    /// Model version
    pub version: ModelVersion,
    /// Root artifact, if the registry has a readable one
    pub artifact: Option<ModelArtifact>,
    /// Inference record, only on a direct graph match
    pub record: Option<InferenceRecord>,
    /// How this correlation was found
    pub kind: MatchKind,
}

/// True for records that take part in normalization
pub fn is_live(state: RecordState) -> bool {
    state != RecordState::Archived
}

/// Finds the registry records behind a deployment
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<dyn ModelRegistry>,
}

impl Resolver {
    /// Create a resolver over the given registry
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the deployment `namespace/name`
    ///
    /// Returns `Ok(None)` when nothing matches. Transport failures propagate.
    #[instrument(skip_all, fields(namespace = %namespace, name = %name))]
    pub async fn resolve(&self, namespace: &str, name: &str) -> Result<Option<Correlation>, Error> {
        let models: Vec<RegisteredModel> = self
            .registry
            .list_registered_models()
            .await?
            .into_iter()
            .filter(|m| is_live(m.state))
            .collect();

        if models.is_empty() {
            debug!("registry has no live registered models");
            return Ok(None);
        }

        if let Some(found) = self.direct_match(&models, namespace, name).await? {
            return Ok(Some(found));
        }

        self.name_pattern_match(&models, name).await
    }

    async fn direct_match(
        &self,
        models: &[RegisteredModel],
        namespace: &str,
        name: &str,
    ) -> Result<Option<Correlation>, Error> {
        let records = self.registry.list_inference_records().await?;

        for model in models {
            for record in records.iter().filter(|r| r.registered_model_id == model.id) {
                let Some(runtime) = record.runtime.as_deref().filter(|r| !r.is_empty()) else {
                    continue;
                };
                if !name.starts_with(runtime) {
                    continue;
                }
                if !record.is_deployed() {
                    debug!(record = %record.id, state = ?record.desired_state, "inference record not deployed");
                    continue;
                }

                let env = match self
                    .registry
                    .get_serving_environment(&record.serving_environment_id)
                    .await
                {
                    Ok(env) => env,
                    Err(e) if e.is_malformed() => {
                        warn!(record = %record.id, error = %e, "serving environment unavailable");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if env.name != namespace {
                    debug!(record = %record.id, environment = %env.name, "serving environment does not match namespace");
                    continue;
                }

                let Some(version_id) = record.model_version_id.as_deref() else {
                    warn!(record = %record.id, "deployed inference record has no model version");
                    continue;
                };
                let version = match self.registry.get_model_version(version_id).await {
                    Ok(v) => v,
                    Err(e) if e.is_malformed() => {
                        warn!(record = %record.id, version = %version_id, error = %e, "model version unavailable");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if !is_live(version.state) {
                    debug!(version = %version.id, "model version archived");
                    continue;
                }

                let artifact = root_artifact(self.registry.as_ref(), model).await?;
                debug!(model = %model.name, version = %version.name, "direct graph match");
                return Ok(Some(Correlation {
                    model: model.clone(),
                    version,
                    artifact,
                    record: Some(record.clone()),
                    kind: MatchKind::DirectGraph,
                }));
            }
        }

        Ok(None)
    }

    async fn name_pattern_match(
        &self,
        models: &[RegisteredModel],
        name: &str,
    ) -> Result<Option<Correlation>, Error> {
        let target = sanitize_lower(name);

        for model in models {
            let versions = self.registry.list_model_versions(&model.id).await?;
            let matched = versions
                .into_iter()
                .filter(|v| is_live(v.state))
                .find(|v| deployment_name_for(&model.name, &v.name) == target);

            if let Some(version) = matched {
                let artifact = root_artifact(self.registry.as_ref(), model).await?;
                debug!(model = %model.name, version = %version.name, "name pattern match");
                return Ok(Some(Correlation {
                    model: model.clone(),
                    version,
                    artifact,
                    record: None,
                    kind: MatchKind::NamePattern,
                }));
            }
        }

        debug!("no registry correlation");
        Ok(None)
    }
}
