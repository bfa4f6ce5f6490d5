//! Registry of resource kinds created as side effects of a package install
//!
//! When the controller installs a package it may create supporting resources
//! (a service account, RBAC objects, values secrets) and records each one on
//! the PackageInstall as an annotation `<prefix>/<kind-token> = <name>`. The
//! child resources themselves carry an ownership annotation whose value is
//! the install identity `<installName>-<namespace>`.
//!
//! Two annotation prefix generations exist. Both are recognized on read and
//! the current one takes precedence; only the current one is written by the
//! controller. Keys with neither prefix, or with a kind token this client
//! version does not know, are not ownership markers and are skipped.

use std::fmt;

use kube::core::ApiResource;

/// Ownership annotation key stamped on child resources (current generation).
pub const PKG_ANNOTATION: &str = "packaging.pkgctl.dev/package-install";

/// Ownership annotation key written by older releases. Read-only compatibility.
pub const LEGACY_PKG_ANNOTATION: &str = "installer.pkgctl.dev/installed-package";

/// Kind-token prefix inside current-generation parent annotation keys.
const PKG_ANNOTATION_KIND_PREFIX: &str = "package-install-";

/// Kind-token prefix inside legacy parent annotation keys.
const LEGACY_PKG_ANNOTATION_KIND_PREFIX: &str = "installed-package-";

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

/// Identity string a child resource must carry to be deletable by an install.
pub fn install_identity(install_name: &str, namespace: &str) -> String {
    format!("{}-{}", install_name, namespace)
}

/// Closed enumeration of resource kinds the controller creates for an install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatedResourceKind {
    ServiceAccount,
    Secret,
    ConfigMap,
    ClusterRole,
    ClusterRoleBinding,
}

impl CreatedResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatedResourceKind::ServiceAccount => "ServiceAccount",
            CreatedResourceKind::Secret => "Secret",
            CreatedResourceKind::ConfigMap => "ConfigMap",
            CreatedResourceKind::ClusterRole => "ClusterRole",
            CreatedResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
        }
    }

    /// All kinds the registry knows about.
    pub fn all() -> &'static [Self] {
        &[
            CreatedResourceKind::ServiceAccount,
            CreatedResourceKind::Secret,
            CreatedResourceKind::ConfigMap,
            CreatedResourceKind::ClusterRole,
            CreatedResourceKind::ClusterRoleBinding,
        ]
    }

    /// Lowercase plural resource name used in API paths.
    pub fn plural(&self) -> &'static str {
        match self {
            CreatedResourceKind::ServiceAccount => "serviceaccounts",
            CreatedResourceKind::Secret => "secrets",
            CreatedResourceKind::ConfigMap => "configmaps",
            CreatedResourceKind::ClusterRole => "clusterroles",
            CreatedResourceKind::ClusterRoleBinding => "clusterrolebindings",
        }
    }

    /// True for kinds addressed without a namespace.
    pub fn cluster_scoped(&self) -> bool {
        matches!(
            self,
            CreatedResourceKind::ClusterRole | CreatedResourceKind::ClusterRoleBinding
        )
    }

    /// Group/version/resource triple for dynamic API calls.
    pub fn api_resource(&self) -> ApiResource {
        let (group, version) = match self {
            CreatedResourceKind::ClusterRole | CreatedResourceKind::ClusterRoleBinding => {
                (RBAC_GROUP, "v1")
            }
            _ => ("", "v1"),
        };
        let api_version = if group.is_empty() {
            version.to_string()
        } else {
            format!("{}/{}", group, version)
        };
        ApiResource {
            group: group.to_string(),
            version: version.to_string(),
            api_version,
            kind: self.as_str().to_string(),
            plural: self.plural().to_string(),
        }
    }

    /// Deterministic name the controller gives this kind for a given install.
    ///
    /// Used only by the probe-driven cleanup path when the parent install
    /// (and with it the annotation record) is already gone.
    pub fn object_name(&self, install_name: &str, namespace: &str) -> String {
        let suffix = match self {
            CreatedResourceKind::ServiceAccount => "sa",
            CreatedResourceKind::Secret => "values",
            CreatedResourceKind::ConfigMap => "config",
            CreatedResourceKind::ClusterRole => "cluster-role",
            CreatedResourceKind::ClusterRoleBinding => "cluster-rolebinding",
        };
        format!("{}-{}-{}", install_name, namespace, suffix)
    }

    /// Parse a kind token (case-insensitive), returning None if unknown.
    pub fn parse_optional(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "serviceaccount" => Some(CreatedResourceKind::ServiceAccount),
            "secret" => Some(CreatedResourceKind::Secret),
            "configmap" => Some(CreatedResourceKind::ConfigMap),
            "clusterrole" => Some(CreatedResourceKind::ClusterRole),
            "clusterrolebinding" => Some(CreatedResourceKind::ClusterRoleBinding),
            _ => None,
        }
    }

    /// Interpret a parent annotation key as an ownership marker.
    ///
    /// Strips the current prefix first, then the legacy one; both forms yield
    /// the same canonical kind so nothing downstream branches on which prefix
    /// was used. Returns None for keys that are not ownership markers.
    pub fn from_annotation_key(key: &str) -> Option<Self> {
        let (_, suffix) = key.split_once('/')?;
        let token = suffix
            .strip_prefix(PKG_ANNOTATION_KIND_PREFIX)
            .or_else(|| suffix.strip_prefix(LEGACY_PKG_ANNOTATION_KIND_PREFIX))?;
        Self::parse_optional(token)
    }
}

impl fmt::Display for CreatedResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_identity() {
        assert_eq!(install_identity("cert-man", "default"), "cert-man-default");
    }

    #[test]
    fn test_annotation_key_current_prefix() {
        assert_eq!(
            CreatedResourceKind::from_annotation_key(
                "packaging.pkgctl.dev/package-install-ServiceAccount"
            ),
            Some(CreatedResourceKind::ServiceAccount)
        );
        assert_eq!(
            CreatedResourceKind::from_annotation_key(
                "packaging.pkgctl.dev/package-install-ClusterRoleBinding"
            ),
            Some(CreatedResourceKind::ClusterRoleBinding)
        );
    }

    #[test]
    fn test_annotation_key_legacy_prefix_yields_same_kind() {
        assert_eq!(
            CreatedResourceKind::from_annotation_key(
                "installer.pkgctl.dev/installed-package-ServiceAccount"
            ),
            Some(CreatedResourceKind::ServiceAccount)
        );
        // Lowercase tokens from older stampers are accepted too
        assert_eq!(
            CreatedResourceKind::from_annotation_key(
                "installer.pkgctl.dev/installed-package-serviceaccount"
            ),
            Some(CreatedResourceKind::ServiceAccount)
        );
    }

    #[test]
    fn test_annotation_key_unrecognized() {
        // Not an ownership marker at all
        assert_eq!(
            CreatedResourceKind::from_annotation_key(
                "kubectl.kubernetes.io/last-applied-configuration"
            ),
            None
        );
        // No slash
        assert_eq!(CreatedResourceKind::from_annotation_key("package-install-Secret"), None);
        // Ownership prefix but a kind this client does not know (newer controller)
        assert_eq!(
            CreatedResourceKind::from_annotation_key(
                "packaging.pkgctl.dev/package-install-NetworkPolicy"
            ),
            None
        );
    }

    #[test]
    fn test_api_resource_mapping() {
        let sa = CreatedResourceKind::ServiceAccount.api_resource();
        assert_eq!(sa.group, "");
        assert_eq!(sa.version, "v1");
        assert_eq!(sa.api_version, "v1");
        assert_eq!(sa.plural, "serviceaccounts");

        let crb = CreatedResourceKind::ClusterRoleBinding.api_resource();
        assert_eq!(crb.group, "rbac.authorization.k8s.io");
        assert_eq!(crb.api_version, "rbac.authorization.k8s.io/v1");
        assert_eq!(crb.plural, "clusterrolebindings");
    }

    #[test]
    fn test_scope() {
        assert!(!CreatedResourceKind::ServiceAccount.cluster_scoped());
        assert!(!CreatedResourceKind::Secret.cluster_scoped());
        assert!(!CreatedResourceKind::ConfigMap.cluster_scoped());
        assert!(CreatedResourceKind::ClusterRole.cluster_scoped());
        assert!(CreatedResourceKind::ClusterRoleBinding.cluster_scoped());
    }

    #[test]
    fn test_object_names_embed_install_and_namespace() {
        assert_eq!(
            CreatedResourceKind::ServiceAccount.object_name("foo", "ns"),
            "foo-ns-sa"
        );
        assert_eq!(
            CreatedResourceKind::ClusterRole.object_name("foo", "ns"),
            "foo-ns-cluster-role"
        );
        assert_eq!(
            CreatedResourceKind::ClusterRoleBinding.object_name("foo", "ns"),
            "foo-ns-cluster-rolebinding"
        );
    }
}
