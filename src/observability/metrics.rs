//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics exposed
//!
//! - `vault_controller_reconciliations_total` - reconciliation passes
//! - `vault_controller_reconciliation_errors_total` - failed passes
//! - `vault_controller_secrets_created_total` - Secrets created
//! - `vault_controller_secrets_rotated_total` - Secrets rotated
//! - `vault_controller_leases_renewed_total` - leases renewed in place

use crate::reconciler::Outcome;
use anyhow::Result;
use prometheus::{IntCounter, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_controller_reconciliations_total",
        "Total number of reconciliation passes",
    )
    .expect("metric definition is valid")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_controller_reconciliation_errors_total",
        "Total number of failed reconciliation passes",
    )
    .expect("metric definition is valid")
});

static SECRETS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_controller_secrets_created_total",
        "Total number of cluster Secrets created",
    )
    .expect("metric definition is valid")
});

static SECRETS_ROTATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_controller_secrets_rotated_total",
        "Total number of cluster Secrets rotated with fresh vault data",
    )
    .expect("metric definition is valid")
});

static LEASES_RENEWED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_controller_leases_renewed_total",
        "Total number of leases renewed in place",
    )
    .expect("metric definition is valid")
});

/// Register every metric with the shared registry. Called once at
/// startup.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_ROTATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LEASES_RENEWED_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

/// Count the result of a successful reconciliation pass.
pub fn record_outcome(outcome: Outcome) {
    match outcome {
        Outcome::Created => SECRETS_CREATED_TOTAL.inc(),
        Outcome::Rotated => SECRETS_ROTATED_TOTAL.inc(),
        Outcome::Renewed => LEASES_RENEWED_TOTAL.inc(),
        Outcome::Skipped => {}
    }
}

/// Gather the current metric families for the `/metrics` endpoint.
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}
