//! # Vault access
//!
//! Thin adapter around the vault HTTP API. The reconciler consumes
//! vault through the [`VaultApi`] trait so tests can substitute a
//! scripted mock for the real client.

pub mod client;

pub use client::{VaultClient, VaultConfig};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// A response from a vault logical or lease operation.
///
/// Every field is optional on the wire; missing fields map to the
/// empty/zero value, matching vault's own client conventions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeasedSecret {
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub lease_duration: i64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Errors from the vault adapter.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("invalid vault configuration: {0}")]
    InvalidConfig(String),

    #[error("vault request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vault returned status {status} for {path}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },
}

/// The vault operations the controller depends on.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Read a logical path. `None` means the path exists but returned
    /// no body (or vault answered 404).
    async fn read(&self, path: &str) -> Result<Option<LeasedSecret>, VaultError>;

    /// Write a payload to a logical path and return the response
    /// body, if any.
    async fn write(
        &self,
        path: &str,
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<LeasedSecret>, VaultError>;

    /// Renew a lease with an unspecified increment.
    async fn renew_lease(&self, lease_id: &str) -> Result<LeasedSecret, VaultError>;

    /// Revoke a lease.
    async fn revoke_lease(&self, lease_id: &str) -> Result<(), VaultError>;
}
