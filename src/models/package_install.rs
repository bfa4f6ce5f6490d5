//! PackageInstall custom resource

use kube::CustomResource;
use serde::{Deserialize, Serialize};

use super::status::{GenericStatus, ObservedResource};
use super::{API_GROUP, API_VERSION};

/// Desired state of an installed package.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    group = "packaging.pkgctl.dev",
    version = "v1alpha1",
    kind = "PackageInstall",
    plural = "packageinstalls",
    namespaced,
    status = "PackageInstallStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct PackageInstallSpec {
    /// Service account the controller uses to deploy the package contents.
    pub service_account_name: String,
    pub package_ref: PackageRef,
    /// When true the controller stops reconciling this install.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
}

/// Reference to a package and the versions acceptable for it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    pub ref_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_selection: Option<VersionSelection>,
}

/// Semver constraint selecting the package version to install.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSelection {
    pub constraints: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInstallStatus {
    #[serde(flatten)]
    pub generic: GenericStatus,
    /// Version the controller most recently attempted to install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempted_version: Option<String>,
}

impl ObservedResource for PackageInstall {
    fn generation(&self) -> i64 {
        self.metadata.generation.unwrap_or_default()
    }

    fn status(&self) -> Option<&GenericStatus> {
        self.status.as_ref().map(|s| &s.generic)
    }
}

/// Human-readable description used in progress lines and errors.
pub fn package_install_description(name: &str, namespace: &str) -> String {
    let mut description = format!("packageinstall/{} ({}/{})", name, API_GROUP, API_VERSION);
    if namespace.is_empty() {
        description.push_str(" cluster");
    } else {
        description.push_str(&format!(" namespace: {}", namespace));
    }
    description
}
