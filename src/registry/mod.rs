//! Model registry read access
//!
//! The [`ModelRegistry`] trait is the seam the resolver and sweep talk to;
//! [`RegistryClient`] implements it over the registry's REST API.

mod client;
mod types;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::Error;

pub use client::{RegistryClient, API_BASE_PATH};
pub use types::{
    CustomProperties, DesiredState, InferenceRecord, ItemList, MetadataValue, ModelArtifact,
    ModelVersion, RecordState, RegisteredModel, ServingEnvironment,
};

/// Typed read accessors over registry records
///
/// Every call is one network round trip; nothing is cached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// List all registered models
    async fn list_registered_models(&self) -> Result<Vec<RegisteredModel>, Error>;

    /// List the versions of a registered model
    async fn list_model_versions(
        &self,
        registered_model_id: &str,
    ) -> Result<Vec<ModelVersion>, Error>;

    /// Get a model version by id
    async fn get_model_version(&self, id: &str) -> Result<ModelVersion, Error>;

    /// Get a model artifact by id
    async fn get_model_artifact(&self, id: &str) -> Result<ModelArtifact, Error>;

    /// List all inference records
    async fn list_inference_records(&self) -> Result<Vec<InferenceRecord>, Error>;

    /// Get a serving environment by id
    async fn get_serving_environment(&self, id: &str) -> Result<ServingEnvironment, Error>;
}

/// Root artifact of a registered model, or `None` when it is missing or
/// unreadable.
///
/// By registry convention the root artifact shares its id with the
/// registered model, not with any model version.
pub async fn root_artifact(
    registry: &dyn ModelRegistry,
    model: &RegisteredModel,
) -> Result<Option<ModelArtifact>, Error> {
    match registry.get_model_artifact(&model.id).await {
        Ok(artifact) => Ok(Some(artifact)),
        Err(e) if e.is_malformed() => {
            tracing::warn!(
                model = %model.name,
                artifact_id = %model.id,
                error = %e,
                "root artifact unavailable, continuing without it"
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
