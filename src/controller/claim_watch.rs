//! # Claim watch
//!
//! Watches SecretClaims, maintains the claim store, and turns watch
//! events into dispatched reconciliations. Add events and spec
//! changes force a fresh materialization; everything else, including
//! the periodic resync sweep, reconciles without force.

use crate::controller::dispatcher::{ClaimEvent, Dispatcher};
use crate::controller::store::ClaimStore;
use crate::crd::SecretClaim;
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::watcher;
use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Run the claim watch until the stop signal fires.
///
/// When `sync_period` is set, every tick re-emits a synthetic update
/// for each cached claim so drift and expiring leases are reconciled
/// even without an apiserver event.
pub async fn run_claim_watch(
    api: Api<SecretClaim>,
    store: Arc<ClaimStore>,
    dispatcher: Arc<Dispatcher>,
    sync_period: Option<Duration>,
    mut stop: watch::Receiver<bool>,
) {
    let mut stream = pin!(watcher(api, watcher::Config::default().any_semantic()));
    let mut resync = sync_period
        .map(|period| tokio::time::interval_at(tokio::time::Instant::now() + period, period));
    // Keys seen during a (re-)list, used to detect claims deleted
    // while the watch was disconnected.
    let mut relist: Option<HashSet<String>> = None;

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            event = stream.next() => match event {
                None => break,
                Some(Ok(event)) => handle_claim_event(&store, &dispatcher, &mut relist, event),
                Some(Err(err)) => {
                    warn!(error = %err, "claim watch error, stream will retry");
                }
            },
            _ = tick(&mut resync) => {
                let claims = store.snapshot();
                info!(claims = claims.len(), "periodic resync, sweeping all cached claims");
                for (key, claim) in claims {
                    dispatcher.dispatch(key, ClaimEvent::Reconcile { claim, force: false });
                }
            }
        }
    }
    info!("claim watch stopped");
}

async fn tick(resync: &mut Option<tokio::time::Interval>) {
    match resync {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn handle_claim_event(
    store: &Arc<ClaimStore>,
    dispatcher: &Arc<Dispatcher>,
    relist: &mut Option<HashSet<String>>,
    event: watcher::Event<SecretClaim>,
) {
    match event {
        watcher::Event::Init => {
            *relist = Some(HashSet::new());
        }
        watcher::Event::InitApply(claim) => {
            if let (Some(seen), Some(key)) = (relist.as_mut(), claim.key()) {
                seen.insert(key);
            }
            upsert_claim(store, dispatcher, claim);
        }
        watcher::Event::InitDone => {
            let Some(seen) = relist.take() else { return };
            for (key, claim) in store.snapshot() {
                if !seen.contains(&key) {
                    info!(key, "claim disappeared during re-list, deleting its secret");
                    store.remove(&key);
                    dispatcher.dispatch(key, ClaimEvent::Delete { claim });
                }
            }
        }
        watcher::Event::Apply(claim) => upsert_claim(store, dispatcher, claim),
        watcher::Event::Delete(claim) => {
            let Some(key) = claim.key() else {
                error!("dropping claim delete event with no namespace/name key");
                return;
            };
            info!(key, "handling delete for secret claim");
            store.remove(&key);
            dispatcher.dispatch(key, ClaimEvent::Delete { claim: Arc::new(claim) });
        }
    }
}

/// Cache the claim and dispatch a reconciliation. New claims and spec
/// changes force the update branch; metadata churn does not.
fn upsert_claim(store: &Arc<ClaimStore>, dispatcher: &Arc<Dispatcher>, claim: SecretClaim) {
    let Some(key) = claim.key() else {
        error!("dropping claim event with no namespace/name key");
        return;
    };
    let claim = Arc::new(claim);
    let old = store.insert(key.clone(), claim.clone());
    let force = claim_force(old.as_deref(), &claim);
    debug!(key, force, added = old.is_none(), "scheduling create/update for secret");
    dispatcher.dispatch(key, ClaimEvent::Reconcile { claim, force });
}

/// The force bit for a claim event: adds and spec changes force a
/// fresh materialization, pure metadata churn does not.
fn claim_force(old: Option<&SecretClaim>, new: &SecretClaim) -> bool {
    match old {
        None => true,
        Some(old) => old.spec != new.spec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::SecretClaimSpec;
    use kube::core::ObjectMeta;

    fn claim(renew: i64, labels: Option<&str>) -> SecretClaim {
        SecretClaim {
            metadata: ObjectMeta {
                name: Some("db".to_string()),
                namespace: Some("team-a".to_string()),
                labels: labels.map(|value| {
                    [("app".to_string(), value.to_string())].into_iter().collect()
                }),
                ..Default::default()
            },
            spec: SecretClaimSpec {
                type_: "Opaque".to_string(),
                path: "secret/db".to_string(),
                data: None,
                renew,
                annotations: None,
            },
        }
    }

    #[test]
    fn adds_are_forced() {
        assert!(claim_force(None, &claim(0, None)));
    }

    #[test]
    fn spec_changes_are_forced() {
        let old = claim(0, None);
        let new = claim(60, None);
        assert!(claim_force(Some(&old), &new));
    }

    #[test]
    fn metadata_churn_is_not_forced() {
        let old = claim(0, None);
        let new = claim(0, Some("db"));
        assert!(!claim_force(Some(&old), &new));
    }
}
