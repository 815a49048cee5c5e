//! # Dispatcher
//!
//! Fans events from both watch streams into the claim manager with
//! per-key serialization: at most one reconciliation is in flight per
//! `namespace/name` key, events for a key observed mid-flight
//! coalesce into a single follow-up pass, and distinct keys proceed
//! in parallel on their own tasks.

use crate::crd::SecretClaim;
use crate::observability::metrics;
use crate::reconciler::{ClaimManager, Outcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// An event for a single claim key.
#[derive(Clone)]
pub enum ClaimEvent {
    Reconcile { claim: Arc<SecretClaim>, force: bool },
    Delete { claim: Arc<SecretClaim> },
}

/// Merge an event into the pending slot for a key with work in
/// flight. The latest event wins; two reconciles OR their force bits
/// so a forced pass is never downgraded by a later resync tick.
fn coalesce(pending: Option<ClaimEvent>, next: ClaimEvent) -> ClaimEvent {
    match (pending, next) {
        (
            Some(ClaimEvent::Reconcile { force: queued, .. }),
            ClaimEvent::Reconcile { claim, force },
        ) => ClaimEvent::Reconcile {
            claim,
            force: queued || force,
        },
        (_, next) => next,
    }
}

/// Per-key work queue in front of a [`ClaimManager`].
pub struct Dispatcher {
    manager: Arc<dyn ClaimManager>,
    // Key present = reconciliation in flight; the value holds the
    // coalesced follow-up event, if any.
    inflight: Mutex<HashMap<String, Option<ClaimEvent>>>,
}

impl Dispatcher {
    pub fn new(manager: Arc<dyn ClaimManager>) -> Arc<Self> {
        Arc::new(Self {
            manager,
            inflight: Mutex::new(HashMap::new()),
        })
    }

    /// Hand an event to the worker for `key`, starting one if the key
    /// is idle.
    pub fn dispatch(self: &Arc<Self>, key: String, event: ClaimEvent) {
        {
            let mut inflight = self.inflight.lock().expect("dispatcher lock poisoned");
            if let Some(pending) = inflight.get_mut(&key) {
                debug!(key, "coalescing event into in-flight reconciliation");
                *pending = Some(coalesce(pending.take(), event));
                return;
            }
            inflight.insert(key.clone(), None);
        }

        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            dispatcher.worker(key, event).await;
        });
    }

    /// Run events for one key until no follow-up is pending.
    async fn worker(self: Arc<Self>, key: String, mut event: ClaimEvent) {
        loop {
            self.run(&key, &event).await;

            let next = {
                let mut inflight = self.inflight.lock().expect("dispatcher lock poisoned");
                match inflight.get_mut(&key).and_then(Option::take) {
                    Some(next) => Some(next),
                    None => {
                        inflight.remove(&key);
                        None
                    }
                }
            };
            match next {
                Some(next) => event = next,
                None => break,
            }
        }
    }

    async fn run(&self, key: &str, event: &ClaimEvent) {
        match event {
            ClaimEvent::Reconcile { claim, force } => {
                debug!(key, force, "reconciling claim");
                metrics::increment_reconciliations();
                match self.manager.create_or_update_secret(claim, *force).await {
                    Ok(outcome) => {
                        if outcome != Outcome::Skipped {
                            info!(key, outcome = outcome.as_str(), "reconciled claim");
                        }
                        metrics::record_outcome(outcome);
                    }
                    Err(err) => {
                        error!(key, error = %err, "failed to reconcile claim");
                        metrics::increment_reconciliation_errors();
                    }
                }
            }
            ClaimEvent::Delete { claim } => {
                debug!(key, "deleting secret for claim");
                match self.manager.delete_secret(claim).await {
                    Ok(()) => info!(key, "deleted secret for claim"),
                    Err(err) => {
                        error!(key, error = %err, "failed to delete secret for claim");
                        metrics::increment_reconciliation_errors();
                    }
                }
            }
        }
    }
}
