//! REST implementation of [`ModelRegistry`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    InferenceRecord, ItemList, ModelArtifact, ModelVersion, RegisteredModel, ServingEnvironment,
};
use super::ModelRegistry;
use crate::Error;

/// REST API prefix under the registry base URL
pub const API_BASE_PATH: &str = "/api/model_registry/v1alpha3";

/// Registry client configured at construction time
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RegistryClient {
    /// Create a client for the registry at `base_url`
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("failed to create registry HTTP client: {e}")))?;
        Ok(Self::with_http(http, base_url, token))
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_http(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: format!("{}{}", base_url.trim_end_matches('/'), API_BASE_PATH),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "registry request");

        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body)
                    .map_err(|e| Error::decode(format!("{path}: {e}")))
            }
            StatusCode::NOT_FOUND => Err(Error::not_found(path)),
            status => Err(Error::unexpected_status(url, status.as_u16())),
        }
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        Ok(self.get::<ItemList<T>>(path).await?.items)
    }
}

#[async_trait]
impl ModelRegistry for RegistryClient {
    async fn list_registered_models(&self) -> Result<Vec<RegisteredModel>, Error> {
        self.list("/registered_models").await
    }

    async fn list_model_versions(
        &self,
        registered_model_id: &str,
    ) -> Result<Vec<ModelVersion>, Error> {
        self.list(&format!("/registered_models/{registered_model_id}/versions"))
            .await
    }

    async fn get_model_version(&self, id: &str) -> Result<ModelVersion, Error> {
        self.get(&format!("/model_versions/{id}")).await
    }

    async fn get_model_artifact(&self, id: &str) -> Result<ModelArtifact, Error> {
        self.get(&format!("/model_artifacts/{id}")).await
    }

    async fn list_inference_records(&self) -> Result<Vec<InferenceRecord>, Error> {
        self.list("/inference_services").await
    }

    async fn get_serving_environment(&self, id: &str) -> Result<ServingEnvironment, Error> {
        self.get(&format!("/serving_environments/{id}")).await
    }
}
