//! # kube-vault-controller
//!
//! Process bootstrap: parse flags, wire the vault and cluster
//! clients, start the probe server, and run the controller until a
//! shutdown signal arrives. Configuration failures abort here with a
//! non-zero exit; everything after startup is retried, not fatal.

use anyhow::{Context, Result};
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use kube_vault_controller::cli::Args;
use kube_vault_controller::constants::DEFAULT_METRICS_PORT;
use kube_vault_controller::controller;
use kube_vault_controller::observability::metrics;
use kube_vault_controller::server::{start_server, ServerState};
use kube_vault_controller::vault::{VaultClient, VaultConfig};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kube_vault_controller=info".into()),
        )
        .init();

    info!(
        sync_period = %args.sync_period,
        "kube-vault-controller starting"
    );
    if let Some(namespace) = args.namespace() {
        info!(namespace, "watching a single namespace");
    }
    if let Some(prefix) = args.namespace_prefix() {
        info!(prefix, "claims under the prefix are namespaced");
    }

    metrics::register_metrics().context("failed to register metrics")?;

    let server_state = ServerState::new();
    let server_port = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_METRICS_PORT);
    let probe_state = server_state.clone();
    tokio::spawn(async move {
        if let Err(err) = start_server(server_port, probe_state).await {
            error!("HTTP server error: {err}");
        }
    });

    let mut vault_config = VaultConfig::from_env().context("failed to read vault environment")?;
    if let Some(address) = args.vault.clone() {
        vault_config.address = address;
    }
    let vault =
        Arc::new(VaultClient::new(vault_config).context("failed to build vault client")?);

    let kube_config = cluster_config(args.apiserver.as_deref(), args.kubeconfig.as_deref())
        .await
        .context("failed to resolve cluster configuration")?;
    let client = Client::try_from(kube_config).context("failed to build cluster client")?;

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let shutdown_state = server_state.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal, stopping watches");
        shutdown_state.is_ready.store(false, Ordering::Relaxed);
        let _ = stop_tx.send(true);
    });

    server_state.is_ready.store(true, Ordering::Relaxed);

    controller::run(
        controller::Config {
            namespace: args.namespace(),
            namespace_prefix: args.namespace_prefix(),
            sync_period: args.sync_period(),
        },
        client,
        vault,
        stop_rx,
    )
    .await?;

    info!("controller stopped");
    Ok(())
}

/// Resolve the cluster configuration: explicit apiserver URL first,
/// then an explicit kubeconfig path, then inference (in-cluster
/// service account or default kubeconfig).
async fn cluster_config(apiserver: Option<&str>, kubeconfig: Option<&Path>) -> Result<Config> {
    if let Some(url) = apiserver {
        let url = url
            .parse()
            .with_context(|| format!("invalid apiserver url {url:?}"))?;
        return Ok(Config::new(url));
    }
    if let Some(path) = kubeconfig {
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
        return Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("failed to load kubeconfig");
    }
    Config::infer().await.context("failed to infer cluster config")
}
