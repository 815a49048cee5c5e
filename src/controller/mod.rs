//! # Controller
//!
//! Wires the two watch streams, the claim store, and the per-key
//! dispatcher around one reconciler. Both watches share a single stop
//! signal; in-flight reconciliations are allowed to complete after it
//! fires.

pub mod claim_watch;
pub mod dispatcher;
pub mod secret_watch;
pub mod store;

use crate::clock::SystemClock;
use crate::cluster::KubeSecretStore;
use crate::crd::SecretClaim;
use crate::reconciler::{ClaimManager, Reconciler};
use crate::vault::VaultApi;
use anyhow::{Context, Result};
use dispatcher::Dispatcher;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use store::ClaimStore;
use tokio::sync::watch;

/// Controller scope and policy.
pub struct Config {
    /// Watch a single namespace; `None` watches all namespaces.
    pub namespace: Option<String>,
    /// Namespace-isolation prefix on vault paths; `None` disables the
    /// gate.
    pub namespace_prefix: Option<String>,
    /// Periodic resync interval on the claim stream; `None` disables
    /// resync.
    pub sync_period: Option<Duration>,
}

/// Run both watches until the stop signal fires.
pub async fn run(
    config: Config,
    client: Client,
    vault: Arc<dyn VaultApi>,
    stop: watch::Receiver<bool>,
) -> Result<()> {
    let claims: Api<SecretClaim> = match &config.namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };
    let secrets: Api<Secret> = match &config.namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    let store = Arc::new(ClaimStore::default());
    let manager: Arc<dyn ClaimManager> = Arc::new(Reconciler::new(
        vault,
        Arc::new(KubeSecretStore::new(client)),
        Arc::new(SystemClock),
        config.namespace_prefix,
    ));
    let dispatcher = Dispatcher::new(manager);

    let claim_task = tokio::spawn(claim_watch::run_claim_watch(
        claims,
        store.clone(),
        dispatcher.clone(),
        config.sync_period,
        stop.clone(),
    ));
    let secret_task = tokio::spawn(secret_watch::run_secret_watch(
        secrets,
        store,
        dispatcher,
        stop,
    ));

    let (claims_result, secrets_result) = tokio::join!(claim_task, secret_task);
    claims_result.context("claim watch task panicked")?;
    secrets_result.context("secret watch task panicked")?;
    Ok(())
}
