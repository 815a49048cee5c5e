//! # Secret watch
//!
//! Observes the cluster Secrets in scope to heal out-of-band
//! mutations and deletions. Every event is resolved back to its claim
//! through the claim store; Secrets without a claim are not ours to
//! manage and are ignored.

use crate::controller::dispatcher::{ClaimEvent, Dispatcher};
use crate::controller::store::ClaimStore;
use crate::crd::object_key;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::watcher;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Run the secret watch until the stop signal fires. This stream does
/// not resync; the claim stream's sweep already covers every key.
pub async fn run_secret_watch(
    api: Api<Secret>,
    store: Arc<ClaimStore>,
    dispatcher: Arc<Dispatcher>,
    mut stop: watch::Receiver<bool>,
) {
    let mut stream = pin!(watcher(api, watcher::Config::default().any_semantic()));

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            event = stream.next() => match event {
                None => break,
                Some(Ok(event)) => handle_secret_event(&store, &dispatcher, event),
                Some(Err(err)) => {
                    warn!(error = %err, "secret watch error, stream will retry");
                }
            },
        }
    }
    info!("secret watch stopped");
}

fn handle_secret_event(
    store: &Arc<ClaimStore>,
    dispatcher: &Arc<Dispatcher>,
    event: watcher::Event<Secret>,
) {
    let (secret, op) = match event {
        watcher::Event::Apply(secret) => (secret, "update"),
        watcher::Event::Delete(secret) => (secret, "delete"),
        // The initial listing carries no new information: every
        // Secret the controller owns is covered by the claim
        // stream's own listing.
        watcher::Event::Init | watcher::Event::InitApply(_) | watcher::Event::InitDone => return,
    };

    let Some(key) = object_key(
        secret.metadata.namespace.as_deref(),
        secret.metadata.name.as_deref(),
    ) else {
        error!("dropping secret event with no namespace/name key");
        return;
    };

    let Some(claim) = store.lookup(&key) else {
        debug!(key, op, "skipping secret event, no claim found");
        return;
    };

    info!(key, op, "requesting secret create/update for claim");
    dispatcher.dispatch(key, ClaimEvent::Reconcile { claim, force: false });
}
