//! # Cluster Secret store
//!
//! CRUD seam over cluster `core/v1` Secrets. The reconciler goes
//! through the [`SecretStore`] trait; the production implementation
//! wraps a typed `kube::Api` per namespace.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;

/// Storage operations on cluster Secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a Secret; `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    async fn create(&self, namespace: &str, secret: &Secret) -> Result<()>;

    async fn update(&self, namespace: &str, secret: &Secret) -> Result<()>;

    /// Delete a Secret. Deleting one that is already gone is not an
    /// error.
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// `kube::Api`-backed [`SecretStore`].
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        self.api(namespace)
            .get_opt(name)
            .await
            .with_context(|| format!("failed to get secret {namespace}/{name}"))
    }

    async fn create(&self, namespace: &str, secret: &Secret) -> Result<()> {
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        self.api(namespace)
            .create(&PostParams::default(), secret)
            .await
            .with_context(|| format!("failed to create secret {namespace}/{name}"))?;
        Ok(())
    }

    async fn update(&self, namespace: &str, secret: &Secret) -> Result<()> {
        let name = secret
            .metadata
            .name
            .as_deref()
            .context("secret to update has no name")?;
        self.api(namespace)
            .replace(name, &PostParams::default(), secret)
            .await
            .with_context(|| format!("failed to update secret {namespace}/{name}"))?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to delete secret {namespace}/{name}"))
            }
        }
    }
}
