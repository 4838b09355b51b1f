//! InferenceService controller and registry sweep
//!
//! The controller reacts to deployment events; the sweep catches registry
//! records no event points at. Both publish through the same
//! [`Publisher`](crate::publish::Publisher) and therefore share one dedup
//! ledger.

mod reconcile;
mod sweep;

use std::sync::Arc;

use futures::future::{ready, Ready};
use futures::StreamExt;
use kube::runtime::controller::{self, Action, Config as ControllerConfig};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::Controller;
use kube::{Api, Client};
use tracing::{debug, error, info};

use crate::crd::InferenceService;
use crate::Error;

pub use reconcile::{
    error_policy, reconcile, Context, ContextBuilder, DeploymentSource, KubeDeploymentSource,
    ERROR_REQUEUE,
};
pub use sweep::{run_sweep, sweep_once, SweepReport};

/// Server-side watch timeout in seconds
pub const WATCH_TIMEOUT_SECS: u32 = 25;

/// Item yielded by the controller stream
pub type ReconcileResult =
    Result<(ObjectRef<InferenceService>, Action), controller::Error<Error, watcher::Error>>;

/// Stream sink logging each reconcile outcome for resources of `kind`
pub fn log_reconcile_result(kind: &'static str) -> impl Fn(ReconcileResult) -> Ready<()> {
    move |result| {
        match result {
            Ok((object, action)) => debug!(kind, %object, ?action, "reconciled"),
            Err(controller::Error::ObjectNotFound(object)) => {
                debug!(kind, %object, "object gone before reconcile")
            }
            Err(e) => error!(kind, error = %e, "reconcile failed"),
        }
        ready(())
    }
}

/// Watch every InferenceService in the cluster until a shutdown signal
pub async fn run(client: Client, ctx: Arc<Context>, concurrency: u16) {
    let deployments: Api<InferenceService> = Api::all(client);
    info!(concurrency, "starting InferenceService controller");

    Controller::new(
        deployments,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .with_config(ControllerConfig::default().concurrency(concurrency))
    .shutdown_on_signal()
    .run(reconcile, error_policy, ctx)
    .for_each(log_reconcile_result("InferenceService"))
    .await;

    info!("InferenceService controller stopped");
}
