//! # Lease annotations
//!
//! The three reserved annotations persist vault-visible lease state
//! on the cluster Secrets the controller owns. They are the wire
//! contract that survives controller restarts.

use crate::clock::Clock;
use crate::constants::{
    LEASE_EXPIRATION_ANNOTATION, LEASE_ID_ANNOTATION, RENEWABLE_ANNOTATION,
};
use crate::crd::SecretClaim;
use crate::vault::LeasedSecret;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;

/// Build the annotation map for a Secret backed by `lease`.
///
/// The reserved keys are seeded first; user annotations from the
/// claim are merged in afterwards and never overwrite a key that is
/// already present.
pub fn build_lease_annotations(
    lease: &LeasedSecret,
    claim: &SecretClaim,
    clock: &dyn Clock,
) -> BTreeMap<String, String> {
    let lease_expiration = clock.now_unix() + lease.lease_duration;

    let mut annotations = BTreeMap::from([
        (LEASE_ID_ANNOTATION.to_string(), lease.lease_id.clone()),
        (
            LEASE_EXPIRATION_ANNOTATION.to_string(),
            lease_expiration.to_string(),
        ),
        (
            RENEWABLE_ANNOTATION.to_string(),
            lease.renewable.to_string(),
        ),
    ]);

    if let Some(user) = &claim.spec.annotations {
        for (key, value) in user {
            annotations
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    annotations
}

/// Parse the lease expiration of an existing Secret as unix seconds.
///
/// `None` means the annotation is missing or unparseable; callers
/// treat that as immediately stale.
pub fn lease_expiration(secret: &Secret) -> Option<i64> {
    secret
        .metadata
        .annotations
        .as_ref()?
        .get(LEASE_EXPIRATION_ANNOTATION)?
        .parse()
        .ok()
}

/// The renewable flag of an existing Secret. Missing or garbage
/// values count as not renewable.
pub fn renewable(secret: &Secret) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(RENEWABLE_ANNOTATION))
        .and_then(|value| value.parse().ok())
        .unwrap_or(false)
}

/// The lease id of an existing Secret, empty when absent.
pub fn lease_id(secret: &Secret) -> &str {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(LEASE_ID_ANNOTATION))
        .map_or("", String::as_str)
}
