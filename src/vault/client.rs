//! # Vault HTTP client
//!
//! `reqwest`-backed implementation of [`VaultApi`] speaking the vault
//! HTTP API directly: logical read/write plus lease renew/revoke.
//! Configuration follows the standard vault environment variables,
//! with the address overridable from the command line.

use crate::constants::{DEFAULT_VAULT_ADDR, DEFAULT_VAULT_TIMEOUT_SECS};
use crate::vault::{LeasedSecret, VaultApi, VaultError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the vault client.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Base URL, e.g. `https://vault.example.com:8200`.
    pub address: String,
    /// Ambient token presented on every request.
    pub token: String,
    /// Skip TLS certificate verification (`VAULT_SKIP_VERIFY`).
    pub skip_verify: bool,
    /// Request timeout.
    pub timeout: Duration,
}

impl VaultConfig {
    /// Read configuration from the standard vault environment
    /// variables: `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_SKIP_VERIFY`,
    /// `VAULT_CLIENT_TIMEOUT`.
    pub fn from_env() -> Result<Self, VaultError> {
        let address = std::env::var("VAULT_ADDR")
            .ok()
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string());
        let token = std::env::var("VAULT_TOKEN").unwrap_or_default();
        let skip_verify = std::env::var("VAULT_SKIP_VERIFY")
            .ok()
            .map(|raw| {
                raw.trim()
                    .parse::<bool>()
                    .or_else(|_| raw.trim().parse::<i64>().map(|n| n != 0))
                    .map_err(|_| {
                        VaultError::InvalidConfig(format!(
                            "could not parse VAULT_SKIP_VERIFY value {raw:?}"
                        ))
                    })
            })
            .transpose()?
            .unwrap_or(false);
        let timeout = std::env::var("VAULT_CLIENT_TIMEOUT")
            .ok()
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|_| {
                    VaultError::InvalidConfig(format!(
                        "could not parse VAULT_CLIENT_TIMEOUT value {raw:?}"
                    ))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_VAULT_TIMEOUT_SECS);

        Ok(Self {
            address,
            token,
            skip_verify,
            timeout: Duration::from_secs(timeout),
        })
    }
}

/// Error body returned by vault on non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct VaultErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// Vault HTTP client carrying a single ambient credential.
pub struct VaultClient {
    config: VaultConfig,
    http: reqwest::Client,
}

impl VaultClient {
    pub fn new(config: VaultConfig) -> Result<Self, VaultError> {
        if config.address.is_empty() {
            return Err(VaultError::InvalidConfig("vault address is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.skip_verify)
            .build()?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Issue a request and decode an optional secret body.
    ///
    /// 404 and 204 both map to `Ok(None)`: vault answers 404 for a
    /// missing logical path and 204 for writes that return nothing.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<LeasedSecret>, VaultError> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header("X-Vault-Token", &self.config.token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            Ok(None)
        } else if status.is_success() {
            Ok(Some(response.json().await?))
        } else {
            let message = response
                .json::<VaultErrorBody>()
                .await
                .unwrap_or_default()
                .errors
                .join("; ");
            Err(VaultError::Api {
                status: status.as_u16(),
                path: path.to_string(),
                message,
            })
        }
    }
}

#[async_trait]
impl VaultApi for VaultClient {
    async fn read(&self, path: &str) -> Result<Option<LeasedSecret>, VaultError> {
        debug!(path, "vault read");
        self.request(Method::GET, path, None).await
    }

    async fn write(
        &self,
        path: &str,
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<LeasedSecret>, VaultError> {
        debug!(path, "vault write");
        self.request(Method::PUT, path, Some(serde_json::Value::Object(data.clone())))
            .await
    }

    async fn renew_lease(&self, lease_id: &str) -> Result<LeasedSecret, VaultError> {
        debug!(lease_id, "vault renew");
        let body = serde_json::json!({ "lease_id": lease_id, "increment": 0 });
        let renewed = self
            .request(Method::PUT, "sys/leases/renew", Some(body))
            .await?;
        // Renew always answers with lease metadata on success.
        Ok(renewed.unwrap_or_default())
    }

    async fn revoke_lease(&self, lease_id: &str) -> Result<(), VaultError> {
        debug!(lease_id, "vault revoke");
        let body = serde_json::json!({ "lease_id": lease_id });
        self.request(Method::PUT, "sys/leases/revoke", Some(body))
            .await
            .map(|_| ())
    }
}
