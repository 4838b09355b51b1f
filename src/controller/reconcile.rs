//! InferenceService reconciliation
//!
//! Each event re-reads the live deployment, correlates it with the registry,
//! builds the catalog entity and publishes it. Deleted deployments are left
//! alone: nothing already published is withdrawn.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::runtime::controller::Action;
use kube::{Api, Client, ResourceExt};
use tracing::{error, info, instrument};

#[cfg(test)]
use mockall::automock;

use crate::catalog::{BuildInput, EntityBuilder};
use crate::config::NormalizerSettings;
use crate::crd::InferenceService;
use crate::publish::{PublishKey, PublishOutcome, Publisher};
use crate::registry::ModelRegistry;
use crate::resolver::Resolver;
use crate::Error;

/// Delay before retrying a failed reconciliation
pub const ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Read access to live deployments
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeploymentSource: Send + Sync {
    /// Fetch `namespace/name`; `None` if it no longer exists
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<InferenceService>, Error>;
}

/// [`DeploymentSource`] backed by the API server
pub struct KubeDeploymentSource {
    client: Client,
}

impl KubeDeploymentSource {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeploymentSource for KubeDeploymentSource {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<InferenceService>, Error> {
        let api: Api<InferenceService> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

/// Shared state for reconciles and the sweep
pub struct Context {
    /// Registry; `None` runs in deployment-only mode
    pub registry: Option<Arc<dyn ModelRegistry>>,
    /// Live deployment lookups
    pub deployments: Arc<dyn DeploymentSource>,
    /// Publish pipeline, owner of the dedup ledger
    pub publisher: Arc<Publisher>,
    /// Entity builder for the configured format
    pub builder: EntityBuilder,
    /// Runtime settings
    pub settings: NormalizerSettings,
}

impl Context {
    /// Create a builder for a context talking to `client`
    pub fn builder(client: Client, publisher: Arc<Publisher>) -> ContextBuilder {
        ContextBuilder::new(client, publisher)
    }

    /// Create a context from explicit collaborators
    pub fn new(
        registry: Option<Arc<dyn ModelRegistry>>,
        deployments: Arc<dyn DeploymentSource>,
        publisher: Arc<Publisher>,
        settings: NormalizerSettings,
    ) -> Self {
        Self {
            registry,
            deployments,
            publisher,
            builder: EntityBuilder::new(settings.format, settings.defaults.clone()),
            settings,
        }
    }

    /// Correlate, build and publish the deployment `namespace/name`
    pub async fn normalize(&self, namespace: &str, name: &str) -> Result<Action, Error> {
        let Some(deployment) = self.deployments.get(namespace, name).await? else {
            info!("deployment no longer exists, published entities are left in place");
            return Ok(Action::await_change());
        };

        let correlation = match &self.registry {
            Some(registry) => Resolver::new(registry.clone()).resolve(namespace, name).await?,
            None => None,
        };

        let entity = self.builder.build(BuildInput {
            deployment: Some(&deployment),
            correlation: correlation.as_ref(),
        })?;

        let key = match &correlation {
            Some(c) => PublishKey::for_correlation(c),
            None => PublishKey::for_deployment(namespace, name),
        };

        match self.publisher.publish(&key, &entity).await? {
            PublishOutcome::Imported(_) => info!(%key, correlated = correlation.is_some(), "published new catalog entity"),
            PublishOutcome::AlreadyImported => info!(%key, correlated = correlation.is_some(), "refreshed catalog entity"),
        }

        Ok(Action::await_change())
    }
}

/// Builder for [`Context`]
pub struct ContextBuilder {
    client: Client,
    publisher: Arc<Publisher>,
    registry: Option<Arc<dyn ModelRegistry>>,
    deployments: Option<Arc<dyn DeploymentSource>>,
    settings: NormalizerSettings,
}

impl ContextBuilder {
    fn new(client: Client, publisher: Arc<Publisher>) -> Self {
        Self {
            client,
            publisher,
            registry: None,
            deployments: None,
            settings: NormalizerSettings::default(),
        }
    }

    /// Enable registry correlation
    pub fn registry(mut self, registry: Arc<dyn ModelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the deployment source
    pub fn deployments(mut self, deployments: Arc<dyn DeploymentSource>) -> Self {
        self.deployments = Some(deployments);
        self
    }

    /// Set runtime settings
    pub fn settings(mut self, settings: NormalizerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let deployments = self
            .deployments
            .unwrap_or_else(|| Arc::new(KubeDeploymentSource::new(self.client.clone())));
        Context::new(self.registry, deployments, self.publisher, self.settings)
    }
}

/// Reconcile one InferenceService
#[instrument(skip(isvc, ctx), fields(namespace = %isvc.namespace().unwrap_or_default(), name = %isvc.name_any()))]
pub async fn reconcile(isvc: Arc<InferenceService>, ctx: Arc<Context>) -> Result<Action, Error> {
    let namespace = isvc.namespace().unwrap_or_default();
    let name = isvc.name_any();
    let deadline = ctx.settings.reconcile_timeout;

    tokio::time::timeout(deadline, ctx.normalize(&namespace, &name))
        .await
        .map_err(|_| Error::timeout(format!("{namespace}/{name} not normalized within {deadline:?}")))?
}

/// Log the failure and retry shortly
pub fn error_policy(isvc: Arc<InferenceService>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        %error,
        namespace = %isvc.namespace().unwrap_or_default(),
        name = %isvc.name_any(),
        "reconciliation failed"
    );
    Action::requeue(ERROR_REQUEUE)
}
