//! # Claim store
//!
//! Locally cached view of the SecretClaims in scope, keyed by
//! `namespace/name`. Populated by the claim watch, read by both watch
//! handlers and the resync sweep.

use crate::crd::SecretClaim;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe claim cache.
#[derive(Default)]
pub struct ClaimStore {
    claims: RwLock<HashMap<String, Arc<SecretClaim>>>,
}

impl ClaimStore {
    /// Look up a claim by its `namespace/name` key.
    pub fn lookup(&self, key: &str) -> Option<Arc<SecretClaim>> {
        self.claims.read().expect("claim store lock poisoned").get(key).cloned()
    }

    /// Insert or replace a claim, returning the previous version.
    pub fn insert(&self, key: String, claim: Arc<SecretClaim>) -> Option<Arc<SecretClaim>> {
        self.claims
            .write()
            .expect("claim store lock poisoned")
            .insert(key, claim)
    }

    /// Remove a claim, returning the cached version if any.
    pub fn remove(&self, key: &str) -> Option<Arc<SecretClaim>> {
        self.claims.write().expect("claim store lock poisoned").remove(key)
    }

    /// Snapshot of every cached claim, for the resync sweep and
    /// re-list reconciliation.
    pub fn snapshot(&self) -> Vec<(String, Arc<SecretClaim>)> {
        self.claims
            .read()
            .expect("claim store lock poisoned")
            .iter()
            .map(|(key, claim)| (key.clone(), claim.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.claims.read().expect("claim store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::SecretClaimSpec;
    use kube::core::ObjectMeta;

    fn claim(name: &str, renew: i64) -> Arc<SecretClaim> {
        Arc::new(SecretClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("team-a".to_string()),
                ..Default::default()
            },
            spec: SecretClaimSpec {
                type_: "Opaque".to_string(),
                path: "secret/db".to_string(),
                data: None,
                renew,
                annotations: None,
            },
        })
    }

    #[test]
    fn insert_returns_previous_version() {
        let store = ClaimStore::default();
        assert!(store.insert("team-a/db".to_string(), claim("db", 0)).is_none());
        let old = store.insert("team-a/db".to_string(), claim("db", 60)).unwrap();
        assert_eq!(old.spec.renew, 0);
        assert_eq!(store.lookup("team-a/db").unwrap().spec.renew, 60);
    }

    #[test]
    fn remove_clears_the_entry() {
        let store = ClaimStore::default();
        store.insert("team-a/db".to_string(), claim("db", 0));
        assert!(store.remove("team-a/db").is_some());
        assert!(store.lookup("team-a/db").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_lists_all_claims() {
        let store = ClaimStore::default();
        store.insert("team-a/db".to_string(), claim("db", 0));
        store.insert("team-a/cache".to_string(), claim("cache", 0));
        let mut keys: Vec<_> = store.snapshot().into_iter().map(|(key, _)| key).collect();
        keys.sort();
        assert_eq!(keys, vec!["team-a/cache", "team-a/db"]);
    }
}
