//! # Payload shaping
//!
//! Turns a vault response into the data bytes and metadata of the
//! managed cluster Secret.

use crate::clock::Clock;
use crate::constants::{
    PKI_CERTIFICATE_KEY, PKI_PRIVATE_KEY_KEY, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY,
    TLS_SECRET_TYPE,
};
use crate::crd::SecretClaim;
use crate::reconciler::annotations::build_lease_annotations;
use crate::vault::LeasedSecret;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::core::ObjectMeta;
use std::collections::BTreeMap;

/// Build the full cluster Secret materializing `lease` for `claim`.
pub fn secret_for_claim(claim: &SecretClaim, lease: &LeasedSecret, clock: &dyn Clock) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: claim.metadata.name.clone(),
            namespace: claim.metadata.namespace.clone(),
            annotations: Some(build_lease_annotations(lease, claim, clock)),
            ..Default::default()
        },
        type_: Some(claim.spec.type_.clone()),
        data: Some(secret_data(claim, lease)),
        ..Default::default()
    }
}

/// Re-annotate `existing` with fresh lease metadata, keeping its type
/// and data bytes unchanged.
pub fn reannotated_secret(
    existing: &Secret,
    claim: &SecretClaim,
    lease: &LeasedSecret,
    clock: &dyn Clock,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: claim.metadata.name.clone(),
            namespace: claim.metadata.namespace.clone(),
            annotations: Some(build_lease_annotations(lease, claim, clock)),
            ..Default::default()
        },
        type_: existing.type_.clone(),
        data: existing.data.clone(),
        ..Default::default()
    }
}

/// Shape the vault response data into Secret bytes.
///
/// TLS claims produce exactly `tls.crt` and `tls.key` from the PKI
/// response keys. Everything else copies string values byte-for-byte;
/// a non-string value keeps its key with empty bytes, which is what
/// consumers of the original wire format expect.
pub fn secret_data(claim: &SecretClaim, lease: &LeasedSecret) -> BTreeMap<String, ByteString> {
    if claim.spec.type_ == TLS_SECRET_TYPE {
        return BTreeMap::from([
            (
                TLS_CERT_KEY.to_string(),
                string_bytes(claim, PKI_CERTIFICATE_KEY, lease.data.get(PKI_CERTIFICATE_KEY)),
            ),
            (
                TLS_PRIVATE_KEY_KEY.to_string(),
                string_bytes(claim, PKI_PRIVATE_KEY_KEY, lease.data.get(PKI_PRIVATE_KEY_KEY)),
            ),
        ]);
    }

    lease
        .data
        .iter()
        .map(|(key, value)| {
            let bytes = match value.as_str() {
                Some(text) => ByteString(text.as_bytes().to_vec()),
                None => ByteString(Vec::new()),
            };
            (key.clone(), bytes)
        })
        .collect()
}

fn string_bytes(claim: &SecretClaim, key: &str, value: Option<&serde_json::Value>) -> ByteString {
    match value.and_then(|value| value.as_str()) {
        Some(text) => ByteString(text.as_bytes().to_vec()),
        None => {
            tracing::warn!(
                path = claim.spec.path,
                key,
                "TLS response value is missing or not a string, producing empty bytes"
            );
            ByteString(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        LEASE_EXPIRATION_ANNOTATION, LEASE_ID_ANNOTATION, RENEWABLE_ANNOTATION,
    };
    use crate::crd::SecretClaimSpec;
    use crate::clock::Clock;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_unix(&self) -> i64 {
            self.0
        }
    }

    fn claim(type_: &str) -> SecretClaim {
        SecretClaim {
            metadata: ObjectMeta {
                name: Some("db".to_string()),
                namespace: Some("team-a".to_string()),
                ..Default::default()
            },
            spec: SecretClaimSpec {
                type_: type_.to_string(),
                path: "secret/db".to_string(),
                data: None,
                renew: 0,
                annotations: None,
            },
        }
    }

    fn lease_with_data(data: serde_json::Value) -> LeasedSecret {
        LeasedSecret {
            lease_id: "lid1".to_string(),
            lease_duration: 7200,
            renewable: true,
            data: data.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn opaque_data_copies_string_values() {
        let lease = lease_with_data(serde_json::json!({"password": "p", "user": "admin"}));
        let data = secret_data(&claim("Opaque"), &lease);
        assert_eq!(data["password"], ByteString(b"p".to_vec()));
        assert_eq!(data["user"], ByteString(b"admin".to_vec()));
    }

    #[test]
    fn opaque_non_string_values_keep_key_with_empty_bytes() {
        let lease = lease_with_data(serde_json::json!({"password": "p", "max_ttl": 86400}));
        let data = secret_data(&claim("Opaque"), &lease);
        assert_eq!(data["max_ttl"], ByteString(Vec::new()));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn tls_data_maps_pki_keys() {
        let lease = lease_with_data(serde_json::json!({
            "certificate": "CERT",
            "private_key": "KEY",
            "serial_number": "01"
        }));
        let data = secret_data(&claim(TLS_SECRET_TYPE), &lease);
        assert_eq!(data.len(), 2);
        assert_eq!(data[TLS_CERT_KEY], ByteString(b"CERT".to_vec()));
        assert_eq!(data[TLS_PRIVATE_KEY_KEY], ByteString(b"KEY".to_vec()));
    }

    #[test]
    fn tls_missing_or_non_string_values_produce_empty_bytes() {
        let lease = lease_with_data(serde_json::json!({"certificate": 42}));
        let data = secret_data(&claim(TLS_SECRET_TYPE), &lease);
        assert_eq!(data[TLS_CERT_KEY], ByteString(Vec::new()));
        assert_eq!(data[TLS_PRIVATE_KEY_KEY], ByteString(Vec::new()));
    }

    #[test]
    fn secret_for_claim_carries_identity_type_and_annotations() {
        let lease = lease_with_data(serde_json::json!({"password": "p"}));
        let secret = secret_for_claim(&claim("Opaque"), &lease, &FixedClock(1_000));
        assert_eq!(secret.metadata.name.as_deref(), Some("db"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        let annotations = secret.metadata.annotations.unwrap();
        assert_eq!(annotations[LEASE_ID_ANNOTATION], "lid1");
        assert_eq!(annotations[LEASE_EXPIRATION_ANNOTATION], "8200");
        assert_eq!(annotations[RENEWABLE_ANNOTATION], "true");
    }

    #[test]
    fn reannotation_keeps_existing_bytes_and_type() {
        let lease = lease_with_data(serde_json::json!({"password": "new"}));
        let existing = Secret {
            type_: Some("Opaque".to_string()),
            data: Some(BTreeMap::from([(
                "password".to_string(),
                ByteString(b"old".to_vec()),
            )])),
            ..Default::default()
        };
        let updated = reannotated_secret(&existing, &claim("Opaque"), &lease, &FixedClock(0));
        assert_eq!(
            updated.data.unwrap()["password"],
            ByteString(b"old".to_vec())
        );
        assert_eq!(updated.type_.as_deref(), Some("Opaque"));
        assert_eq!(
            updated.metadata.annotations.unwrap()[LEASE_EXPIRATION_ANNOTATION],
            "7200"
        );
    }
}
