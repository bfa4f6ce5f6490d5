//! PackageRepository custom resource

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use super::status::{GenericStatus, ObservedResource};
use super::{API_GROUP, API_VERSION};

/// Desired state of a package repository.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    group = "packaging.pkgctl.dev",
    version = "v1alpha1",
    kind = "PackageRepository",
    plural = "packagerepositories",
    namespaced,
    status = "PackageRepositoryStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct PackageRepositorySpec {
    pub fetch: RepositoryFetch,
}

/// Where the repository bundle is fetched from.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFetch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imgpkg_bundle: Option<ImgpkgBundle>,
}

/// OCI registry location of a repository bundle.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImgpkgBundle {
    pub image: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRepositoryStatus {
    #[serde(flatten)]
    pub generic: GenericStatus,
}

impl ObservedResource for PackageRepository {
    fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    fn status(&self) -> Option<&GenericStatus> {
        self.status.as_ref().map(|s| &s.generic)
    }
}

/// Human-readable description used in progress lines and errors.
pub fn package_repository_description(name: &str, namespace: &str) -> String {
    let mut description = format!("packagerepository/{} ({}/{})", name, API_GROUP, API_VERSION);
    if namespace.is_empty() {
        description.push_str(" cluster");
    } else {
        description.push_str(&format!(" namespace: {}", namespace));
    }
    description
}
