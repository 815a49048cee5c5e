//! # Reconciler
//!
//! Decision core and executor for SecretClaims. Given a claim, a
//! force bit, and the existing cluster Secret, the reconciler decides
//! whether to create, renew in place, rotate, or skip, then drives
//! that decision against the vault and the cluster API.
//!
//! ## Decision flow
//!
//! 1. Namespace-isolation gate: a prefixed path outside the claim's
//!    own namespace rejects the claim.
//! 2. No existing Secret ⇒ create from a fresh vault response.
//! 3. Existing Secret, not forced, lease fresher than the renewal
//!    buffer ⇒ skip.
//! 4. Otherwise enter the update branch: renewable leases are renewed
//!    in place when the renewed duration clears the buffer; anything
//!    else rotates to fresh credential material.

pub mod annotations;
pub mod paths;
pub mod payload;

use crate::clock::Clock;
use crate::cluster::SecretStore;
use crate::constants::DEFAULT_RENEW_BUFFER_SECS;
use crate::crd::SecretClaim;
use crate::vault::{LeasedSecret, VaultApi, VaultError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Renewed,
    Rotated,
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Renewed => "renewed",
            Outcome::Rotated => "rotated",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Errors surfaced by a reconciliation pass.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("claim has no namespace/name key")]
    MissingKey,

    #[error("{key}: cannot use path {path:?} because it is under the namespace prefix {prefix:?} but not in its own namespace {namespace:?}")]
    PathNotAllowed {
        key: String,
        path: String,
        prefix: String,
        namespace: String,
    },

    #[error("no secret found for {0}")]
    EmptySecret(String),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("cluster api error: {0}")]
    Cluster(anyhow::Error),
}

/// Entry points the event handlers drive. One implementation per
/// controller instance; mocked in tests.
#[async_trait]
pub trait ClaimManager: Send + Sync {
    /// Ensure the cluster Secret for `claim` exists and is fresh.
    /// `force` takes the update branch regardless of lease freshness.
    async fn create_or_update_secret(
        &self,
        claim: &SecretClaim,
        force: bool,
    ) -> Result<Outcome, ReconcileError>;

    /// Revoke the backing lease (best effort) and delete the cluster
    /// Secret for a deleted claim.
    async fn delete_secret(&self, claim: &SecretClaim) -> Result<(), ReconcileError>;
}

/// The renewal buffer of a claim in seconds. A claim with `renew: 0`
/// gets the 1 hour default; this is the only place that default is
/// applied.
pub fn renew_buffer(claim: &SecretClaim) -> i64 {
    if claim.spec.renew == 0 {
        DEFAULT_RENEW_BUFFER_SECS
    } else {
        claim.spec.renew
    }
}

/// Outcome of the update branch for an existing Secret.
enum UpdateAction {
    Skip,
    Rotate,
    Renew(LeasedSecret),
}

/// Production [`ClaimManager`] over the vault and cluster seams.
pub struct Reconciler {
    vault: Arc<dyn VaultApi>,
    secrets: Arc<dyn SecretStore>,
    clock: Arc<dyn Clock>,
    namespace_prefix: Option<String>,
}

impl Reconciler {
    pub fn new(
        vault: Arc<dyn VaultApi>,
        secrets: Arc<dyn SecretStore>,
        clock: Arc<dyn Clock>,
        namespace_prefix: Option<String>,
    ) -> Self {
        Self {
            vault,
            secrets,
            clock,
            namespace_prefix: namespace_prefix.filter(|prefix| !prefix.is_empty()),
        }
    }

    /// Seconds until the existing Secret enters the renewal buffer.
    /// `None` when the expiration annotation is missing or
    /// unparseable, which counts as immediately stale.
    fn time_until_update(&self, claim: &SecretClaim, existing: &Secret) -> Option<i64> {
        let expiration = annotations::lease_expiration(existing)?;
        Some(expiration - (self.clock.now_unix() + renew_buffer(claim)))
    }

    /// Decide how to refresh an existing Secret that is forced or
    /// stale.
    async fn plan_update(&self, key: &str, claim: &SecretClaim, existing: &Secret) -> UpdateAction {
        if !annotations::renewable(existing) {
            debug!(key, "secret is not renewable, rotating");
            return UpdateAction::Rotate;
        }

        let lease_id = annotations::lease_id(existing);
        if lease_id.is_empty() {
            warn!(key, "renewable secret has no lease id, rotating");
            return UpdateAction::Rotate;
        }

        match self.vault.renew_lease(lease_id).await {
            Err(err) => {
                warn!(key, error = %err, "failed to renew lease, rotating");
                UpdateAction::Rotate
            }
            Ok(renewed) => {
                let buffer = renew_buffer(claim);
                if renewed.lease_duration as f64 > buffer as f64 {
                    info!(key, lease_duration = renewed.lease_duration, "lease renewed");
                    UpdateAction::Renew(renewed)
                } else {
                    info!(
                        key,
                        lease_duration = renewed.lease_duration,
                        buffer,
                        "renewed duration is within the renew buffer, rotating"
                    );
                    UpdateAction::Rotate
                }
            }
        }
    }

    /// Fetch fresh material from the vault: write the claim payload
    /// when one is present, read the path otherwise.
    async fn fresh_secret(&self, claim: &SecretClaim) -> Result<LeasedSecret, ReconcileError> {
        let response = match &claim.spec.data {
            Some(data) if !data.is_empty() => self.vault.write(&claim.spec.path, data).await?,
            _ => self.vault.read(&claim.spec.path).await?,
        };
        response.ok_or_else(|| ReconcileError::EmptySecret(claim.spec.path.clone()))
    }

    fn check_path(&self, key: &str, claim: &SecretClaim) -> Result<(), ReconcileError> {
        let Some(prefix) = &self.namespace_prefix else {
            return Ok(());
        };
        let namespace = claim.metadata.namespace.as_deref().unwrap_or_default();
        if paths::path_allowed(&claim.spec.path, prefix, namespace) {
            return Ok(());
        }
        Err(ReconcileError::PathNotAllowed {
            key: key.to_string(),
            path: claim.spec.path.clone(),
            prefix: prefix.clone(),
            namespace: namespace.to_string(),
        })
    }
}

#[async_trait]
impl ClaimManager for Reconciler {
    async fn create_or_update_secret(
        &self,
        claim: &SecretClaim,
        force: bool,
    ) -> Result<Outcome, ReconcileError> {
        let key = claim.key().ok_or(ReconcileError::MissingKey)?;
        self.check_path(&key, claim)?;

        let namespace = claim.metadata.namespace.as_deref().unwrap_or_default();
        let name = claim.metadata.name.as_deref().unwrap_or_default();

        let existing = self
            .secrets
            .get(namespace, name)
            .await
            .map_err(ReconcileError::Cluster)?;

        let Some(existing) = existing else {
            info!(key, path = claim.spec.path, "creating secret from vault path");
            let lease = self.fresh_secret(claim).await?;
            let secret = payload::secret_for_claim(claim, &lease, self.clock.as_ref());
            self.secrets
                .create(namespace, &secret)
                .await
                .map_err(ReconcileError::Cluster)?;
            info!(key, path = claim.spec.path, "created secret");
            return Ok(Outcome::Created);
        };

        let action = if force {
            self.plan_update(&key, claim, &existing).await
        } else {
            match self.time_until_update(claim, &existing) {
                Some(remaining) if remaining > 0 => {
                    debug!(key, remaining, "lease is fresh, skipping");
                    UpdateAction::Skip
                }
                Some(remaining) => {
                    info!(key, remaining, "lease is within the renew buffer");
                    self.plan_update(&key, claim, &existing).await
                }
                None => {
                    warn!(key, "missing or unparseable lease expiration, treating as stale");
                    self.plan_update(&key, claim, &existing).await
                }
            }
        };

        match action {
            UpdateAction::Skip => Ok(Outcome::Skipped),
            UpdateAction::Renew(lease) => {
                let secret =
                    payload::reannotated_secret(&existing, claim, &lease, self.clock.as_ref());
                self.secrets
                    .update(namespace, &secret)
                    .await
                    .map_err(ReconcileError::Cluster)?;
                Ok(Outcome::Renewed)
            }
            UpdateAction::Rotate => {
                info!(key, path = claim.spec.path, "rotating secret from vault path");
                let lease = self.fresh_secret(claim).await?;
                let secret = payload::secret_for_claim(claim, &lease, self.clock.as_ref());
                self.secrets
                    .update(namespace, &secret)
                    .await
                    .map_err(ReconcileError::Cluster)?;
                Ok(Outcome::Rotated)
            }
        }
    }

    async fn delete_secret(&self, claim: &SecretClaim) -> Result<(), ReconcileError> {
        let key = claim.key().ok_or(ReconcileError::MissingKey)?;
        let namespace = claim.metadata.namespace.as_deref().unwrap_or_default();
        let name = claim.metadata.name.as_deref().unwrap_or_default();

        match self.secrets.get(namespace, name).await {
            Err(err) => {
                warn!(key, error = %err, "not revoking, failed to get secret for deleted claim");
            }
            Ok(None) => {
                info!(key, "not revoking, secret is already gone");
            }
            Ok(Some(secret)) => {
                let lease_id = annotations::lease_id(&secret);
                if lease_id.is_empty() {
                    info!(key, "not revoking, no lease id annotation");
                } else {
                    match self.vault.revoke_lease(lease_id).await {
                        Ok(()) => info!(key, lease_id, "revoked lease"),
                        Err(err) => {
                            warn!(key, lease_id, error = %err, "failed to revoke lease")
                        }
                    }
                }
            }
        }

        info!(key, "deleting secret");
        self.secrets
            .delete(namespace, name)
            .await
            .map_err(ReconcileError::Cluster)
    }
}
