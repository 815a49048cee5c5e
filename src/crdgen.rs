//! # CRD generator
//!
//! Prints the `SecretClaim` CustomResourceDefinition YAML.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use kube_vault_controller::crd::SecretClaim;

fn main() {
    let crd = SecretClaim::crd();
    match serde_yaml::to_string(&crd) {
        Ok(yaml) => print!("{yaml}"),
        Err(err) => {
            eprintln!("failed to serialize CRD to YAML: {err}");
            std::process::exit(1);
        }
    }
}
