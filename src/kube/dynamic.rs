//! Dynamic resource operations
//!
//! Cleanup addresses child resources by group/version/resource triple rather
//! than by typed API, since the set of kinds is data-driven (it comes from
//! annotations recorded on the parent install). The [`DynamicOps`] trait is
//! the seam that lets the cleanup logic run against a fake in unit tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject};
use kube::core::ApiResource;
use kube::Client;

use super::is_not_found;

/// Minimal dynamic-client surface needed by resource cleanup.
#[async_trait]
pub trait DynamicOps: Send + Sync {
    /// Fetch a resource's annotations, or None if the resource is absent.
    async fn get_annotations(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, kube::Error>;

    /// Delete a resource. Not-found surfaces as an error; callers decide
    /// whether absence counts as already-clean.
    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), kube::Error>;
}

/// [`DynamicOps`] backed by a real cluster connection.
pub struct DynamicClient {
    client: Client,
}

impl DynamicClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }
}

#[async_trait]
impl DynamicOps for DynamicClient {
    async fn get_annotations(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, kube::Error> {
        match self.api(resource, namespace).get(name).await {
            Ok(obj) => Ok(Some(obj.metadata.annotations.unwrap_or_default())),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), kube::Error> {
        self.api(resource, namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}
