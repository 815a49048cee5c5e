//! # SecretClaim custom resource
//!
//! The `SecretClaim` resource is a namespaced, declarative request
//! that a cluster Secret of the same name be kept in sync with the
//! result of a vault operation.
//!
//! ```yaml
//! apiVersion: vaultproject.io/v1
//! kind: SecretClaim
//! metadata:
//!   name: db
//!   namespace: team-a
//! spec:
//!   type: Opaque
//!   path: secret/db
//!   renew: 3600
//! ```

use kube::CustomResource;
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired state of a vault-backed cluster Secret.
///
/// Spec equality is structural (`PartialEq` over every field); claim
/// update events whose spec changed force a fresh materialization.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "SecretClaim",
    group = "vaultproject.io",
    version = "v1",
    plural = "secretclaims",
    namespaced
)]
pub struct SecretClaimSpec {
    /// Cluster Secret type to produce, e.g. `Opaque` or
    /// `kubernetes.io/tls`. The TLS type changes payload shaping.
    #[serde(rename = "type", default = "default_secret_type")]
    pub type_: String,

    /// Vault logical path to read or write.
    pub path: String,

    /// Optional payload. Non-empty data turns the vault operation
    /// into a write of this payload; absent or empty data reads the
    /// path instead.
    #[serde(default)]
    #[schemars(schema_with = "free_form_object_schema")]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,

    /// Renewal buffer in seconds. `0` selects the 1 hour default.
    #[serde(default)]
    pub renew: i64,

    /// Extra annotations merged onto the produced Secret. Reserved
    /// lease annotations always win over these.
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
}

fn default_secret_type() -> String {
    "Opaque".to_string()
}

/// Schema for the free-form vault payload.
///
/// The payload is an arbitrary JSON object, which kube-rs cannot
/// express as a structural schema; mark it
/// `x-kubernetes-preserve-unknown-fields` and validate at runtime.
fn free_form_object_schema(gen: &mut SchemaGenerator) -> Schema {
    let schema = gen.root_schema_for::<serde_json::Value>();
    let mut schema_value: serde_json::Value = schema.into();
    if let serde_json::Value::Object(ref mut map) = schema_value {
        map.insert(
            "description".to_string(),
            serde_json::json!("Arbitrary payload written to the vault path. Empty or absent payloads read the path instead."),
        );
        map.insert(
            "x-kubernetes-preserve-unknown-fields".to_string(),
            serde_json::json!(true),
        );
    }
    Schema::try_from(schema_value).expect("free-form payload schema is valid JSON")
}

impl SecretClaim {
    /// `namespace/name` cache key of this claim, which is also the
    /// identity of the managed cluster Secret.
    pub fn key(&self) -> Option<String> {
        object_key(self.metadata.namespace.as_deref(), self.metadata.name.as_deref())
    }

    /// True when the claim carries a payload to write to the vault.
    pub fn has_write_payload(&self) -> bool {
        self.spec.data.as_ref().is_some_and(|data| !data.is_empty())
    }
}

/// Build the `namespace/name` key shared by claims and Secrets.
pub fn object_key(namespace: Option<&str>, name: Option<&str>) -> Option<String> {
    match (namespace, name) {
        (Some(namespace), Some(name)) => Some(format!("{namespace}/{name}")),
        _ => None,
    }
}
