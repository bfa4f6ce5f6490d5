//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and provides dynamic
//! (GVR-addressed) access for the cleanup paths.

pub mod dynamic;

pub use dynamic::{DynamicClient, DynamicOps};

use anyhow::{Context, Result};
use kube::{Client, Config};

/// Initialize and return a Kubernetes client.
///
/// Uses the default kubeconfig loading strategy:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client() -> Result<Client> {
    let config = Config::infer()
        .await
        .context("Failed to infer Kubernetes configuration")?;
    let client = Client::try_from(config).context("Failed to build Kubernetes client")?;
    Ok(client)
}

/// True when the error is the API server reporting 404 for the resource.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}
