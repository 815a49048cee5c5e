//! # Command line
//!
//! Flags for the controller binary. Everything is optional: with no
//! flags the controller watches all namespaces, never resyncs, and
//! resolves both vault and cluster endpoints from the environment.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "kube-vault-controller",
    about = "Materialize vault secrets from SecretClaim resources and manage the leases behind them"
)]
pub struct Args {
    /// Vault address. Overrides VAULT_ADDR from the environment.
    #[arg(long, value_name = "URL")]
    pub vault: Option<String>,

    /// Kubernetes apiserver URL. Resolved via kubeconfig or the
    /// in-cluster service account when unset.
    #[arg(long, value_name = "URL")]
    pub apiserver: Option<String>,

    /// Path to a kubeconfig file. Defaults to in-cluster config.
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace to watch for claims. Watches all namespaces when
    /// unset.
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Claims with a vault path under this prefix are only allowed to
    /// read within their own namespace.
    #[arg(long = "namespace-prefix", value_name = "PREFIX")]
    pub namespace_prefix: Option<String>,

    /// Re-sync all claims each period, e.g. "10m" or "1h". "0s"
    /// disables periodic resync.
    #[arg(long = "sync-period", value_name = "DURATION", default_value = "0s")]
    pub sync_period: humantime::Duration,
}

impl Args {
    /// The resync period, with zero normalized to "disabled".
    pub fn sync_period(&self) -> Option<Duration> {
        let period: Duration = *self.sync_period;
        (!period.is_zero()).then_some(period)
    }

    /// The namespace prefix, with the empty string normalized to
    /// "disabled".
    pub fn namespace_prefix(&self) -> Option<String> {
        self.namespace_prefix.clone().filter(|prefix| !prefix.is_empty())
    }

    /// The watched namespace, with the empty string normalized to
    /// "all namespaces".
    pub fn namespace(&self) -> Option<String> {
        self.namespace.clone().filter(|namespace| !namespace.is_empty())
    }
}
