//! Ownership-tracked cleanup of install side effects
//!
//! Deleting a PackageInstall removes the custom resource, but not the
//! supporting resources the controller created for it. Two cleanup paths
//! exist:
//!
//! - Annotation-driven: while the parent still exists its annotations are the
//!   authoritative provenance record, mapping each created kind to the exact
//!   resource name. Deletes are unconditional because the caller already
//!   confirmed the parent's identity before snapshotting the annotations.
//! - Probe-driven: when the parent is already gone, provenance is
//!   reconstructed by computing deterministic names for a fixed subset of
//!   kinds and re-validating ownership on each candidate before deleting.
//!
//! The probe table is intentionally narrower than the annotation path: only
//! kinds whose names derive from the install identity (service account,
//! cluster role, cluster role binding) can be found without the parent's
//! record. This is a best-effort fallback, not a completeness guarantee.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};

use crate::kube::{is_not_found, DynamicOps};
use crate::models::{
    install_identity, CreatedResourceKind, LEGACY_PKG_ANNOTATION, PKG_ANNOTATION,
};
use crate::wait::ProgressSink;

/// Kinds probed when the parent install is already gone.
const PROBED_KINDS: &[CreatedResourceKind] = &[
    CreatedResourceKind::ServiceAccount,
    CreatedResourceKind::ClusterRole,
    CreatedResourceKind::ClusterRoleBinding,
];

/// Deletes the resources a package install created as side effects.
pub struct ResourceCleaner<'a, D: DynamicOps> {
    ops: &'a D,
    install_name: &'a str,
    namespace: &'a str,
}

impl<'a, D: DynamicOps> ResourceCleaner<'a, D> {
    pub fn new(ops: &'a D, install_name: &'a str, namespace: &'a str) -> Self {
        Self {
            ops,
            install_name,
            namespace,
        }
    }

    /// Delete every resource named in the parent's annotation snapshot.
    ///
    /// Each kind is deleted at most once even when multiple annotation
    /// entries reference it. Unrecognized keys are skipped so a newer
    /// controller stamping kinds this client does not know cannot break
    /// uninstall. A not-found response means already-clean; any other error
    /// aborts the cleanup immediately.
    pub async fn delete_created_resources(
        &self,
        annotations: &BTreeMap<String, String>,
        sink: &mut dyn ProgressSink,
    ) -> Result<()> {
        let mut deleted: HashSet<CreatedResourceKind> = HashSet::new();

        for (key, resource_name) in annotations {
            let Some(kind) = CreatedResourceKind::from_annotation_key(key) else {
                continue;
            };
            if !deleted.insert(kind) {
                continue;
            }

            sink.line(&format!("Deleting '{}': {}", kind, resource_name));
            tracing::debug!("Deleting {} '{}' recorded by annotation '{}'", kind, resource_name, key);

            match self
                .ops
                .delete(&kind.api_resource(), self.scope_namespace(kind), resource_name)
                .await
            {
                Ok(()) => {}
                // Already cleaned up, possibly by a previous partial run
                Err(err) if is_not_found(&err) => {}
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!(
                            "Deleting {} '{}' ({})",
                            kind,
                            resource_name,
                            self.location(kind)
                        )
                    });
                }
            }
        }

        Ok(())
    }

    /// Probe deterministically-named candidates and delete the ones owned by
    /// this install. Used when the parent install no longer exists.
    pub async fn delete_orphaned_resources(&self, sink: &mut dyn ProgressSink) -> Result<()> {
        for kind in PROBED_KINDS {
            self.delete_if_owned(*kind, sink).await?;
        }
        Ok(())
    }

    /// Delete the candidate only when its ownership annotation matches this
    /// install's identity exactly. Absence or a mismatch is skipped silently:
    /// the resource may belong to a different install or never have existed.
    async fn delete_if_owned(
        &self,
        kind: CreatedResourceKind,
        sink: &mut dyn ProgressSink,
    ) -> Result<()> {
        let name = kind.object_name(self.install_name, self.namespace);
        let namespace = self.scope_namespace(kind);

        let annotations = match self
            .ops
            .get_annotations(&kind.api_resource(), namespace, &name)
            .await
        {
            Ok(Some(annotations)) => annotations,
            Ok(None) => return Ok(()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Fetching {} '{}' ({})", kind, name, self.location(kind))
                });
            }
        };

        let identity = install_identity(self.install_name, self.namespace);
        let owned = annotations.get(PKG_ANNOTATION) == Some(&identity)
            || annotations.get(LEGACY_PKG_ANNOTATION) == Some(&identity);
        if !owned {
            tracing::debug!("Skipping {} '{}': not owned by '{}'", kind, name, identity);
            return Ok(());
        }

        sink.line(&format!("Deleting '{}': {}", kind.plural(), name));
        match self.ops.delete(&kind.api_resource(), namespace, &name).await {
            Ok(()) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("Deleting {} '{}' ({})", kind, name, self.location(kind))
            }),
        }
    }

    fn scope_namespace(&self, kind: CreatedResourceKind) -> Option<&str> {
        if kind.cluster_scoped() {
            None
        } else {
            Some(self.namespace)
        }
    }

    fn location(&self, kind: CreatedResourceKind) -> String {
        if kind.cluster_scoped() {
            "cluster".to_string()
        } else {
            format!("namespace: {}", self.namespace)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::RecordingSink;
    use async_trait::async_trait;
    use kube::core::{ApiResource, ErrorResponse};
    use std::collections::HashMap;
    use std::sync::Mutex;

    type ObjectKey = (String, String, String); // (plural, namespace, name)

    /// In-memory [`DynamicOps`] recording every delete issued.
    #[derive(Default)]
    struct FakeDynamicOps {
        objects: Mutex<HashMap<ObjectKey, BTreeMap<String, String>>>,
        delete_calls: Mutex<Vec<ObjectKey>>,
        fail_deletes: Vec<String>,
    }

    impl FakeDynamicOps {
        fn key(resource: &ApiResource, namespace: Option<&str>, name: &str) -> ObjectKey {
            (
                resource.plural.clone(),
                namespace.unwrap_or_default().to_string(),
                name.to_string(),
            )
        }

        fn seed(
            &self,
            kind: CreatedResourceKind,
            namespace: Option<&str>,
            name: &str,
            annotations: BTreeMap<String, String>,
        ) {
            let key = Self::key(&kind.api_resource(), namespace, name);
            self.objects.lock().unwrap().insert(key, annotations);
        }

        fn delete_calls(&self) -> Vec<ObjectKey> {
            self.delete_calls.lock().unwrap().clone()
        }
    }

    fn api_error(code: u16, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: String::new(),
            code,
        })
    }

    #[async_trait]
    impl DynamicOps for FakeDynamicOps {
        async fn get_annotations(
            &self,
            resource: &ApiResource,
            namespace: Option<&str>,
            name: &str,
        ) -> Result<Option<BTreeMap<String, String>>, kube::Error> {
            let key = Self::key(resource, namespace, name);
            Ok(self.objects.lock().unwrap().get(&key).cloned())
        }

        async fn delete(
            &self,
            resource: &ApiResource,
            namespace: Option<&str>,
            name: &str,
        ) -> Result<(), kube::Error> {
            let key = Self::key(resource, namespace, name);
            self.delete_calls.lock().unwrap().push(key.clone());

            if self.fail_deletes.contains(&name.to_string()) {
                return Err(api_error(500, "internal error"));
            }
            if self.objects.lock().unwrap().remove(&key).is_none() {
                return Err(api_error(404, "not found"));
            }
            Ok(())
        }
    }

    fn annotations(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_legacy_annotation_drives_single_delete_and_tolerates_not_found() {
        let ops = FakeDynamicOps::default();
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        // Child was already removed out of band; the delete will 404
        let parent = annotations(&[(
            "installer.pkgctl.dev/installed-package-ServiceAccount",
            "sa-foo",
        )]);

        cleaner
            .delete_created_resources(&parent, &mut sink)
            .await
            .unwrap();

        assert_eq!(
            ops.delete_calls(),
            vec![(
                "serviceaccounts".to_string(),
                "ns".to_string(),
                "sa-foo".to_string()
            )]
        );
        assert_eq!(sink.lines, vec!["Deleting 'ServiceAccount': sa-foo"]);
    }

    #[tokio::test]
    async fn test_each_kind_deleted_at_most_once() {
        let ops = FakeDynamicOps::default();
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        // Both prefix generations reference the same kind
        let parent = annotations(&[
            ("packaging.pkgctl.dev/package-install-Secret", "foo-values"),
            ("installer.pkgctl.dev/installed-package-Secret", "foo-values"),
        ]);

        cleaner
            .delete_created_resources(&parent, &mut sink)
            .await
            .unwrap();

        assert_eq!(ops.delete_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_annotations_produce_no_deletes() {
        let ops = FakeDynamicOps::default();
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        let parent = annotations(&[
            ("kubectl.kubernetes.io/last-applied-configuration", "{}"),
            // Newer controller stamping a kind this client does not know
            ("packaging.pkgctl.dev/package-install-NetworkPolicy", "foo-np"),
        ]);

        cleaner
            .delete_created_resources(&parent, &mut sink)
            .await
            .unwrap();

        assert!(ops.delete_calls().is_empty());
        assert!(sink.lines.is_empty());
    }

    #[tokio::test]
    async fn test_cluster_scoped_kinds_deleted_without_namespace() {
        let ops = FakeDynamicOps::default();
        ops.seed(
            CreatedResourceKind::ClusterRole,
            None,
            "foo-cr",
            BTreeMap::new(),
        );
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        let parent = annotations(&[("packaging.pkgctl.dev/package-install-ClusterRole", "foo-cr")]);

        cleaner
            .delete_created_resources(&parent, &mut sink)
            .await
            .unwrap();

        assert_eq!(
            ops.delete_calls(),
            vec![("clusterroles".to_string(), String::new(), "foo-cr".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delete_error_aborts_cleanup() {
        let ops = FakeDynamicOps {
            fail_deletes: vec!["foo-cr".to_string()],
            ..FakeDynamicOps::default()
        };
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        // BTreeMap iteration order puts the ClusterRole key first
        let parent = annotations(&[
            ("packaging.pkgctl.dev/package-install-ClusterRole", "foo-cr"),
            ("packaging.pkgctl.dev/package-install-ServiceAccount", "foo-sa"),
        ]);

        let err = cleaner
            .delete_created_resources(&parent, &mut sink)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("ClusterRole 'foo-cr'"));
        // Fail-fast: the service account delete was never attempted
        assert_eq!(ops.delete_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_probe_skips_resource_owned_by_another_install() {
        let ops = FakeDynamicOps::default();
        ops.seed(
            CreatedResourceKind::ClusterRoleBinding,
            None,
            "foo-ns-cluster-rolebinding",
            annotations(&[(PKG_ANNOTATION, "bar-ns")]),
        );
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        cleaner.delete_orphaned_resources(&mut sink).await.unwrap();

        assert!(ops.delete_calls().is_empty());
        assert!(sink.lines.is_empty());
    }

    #[tokio::test]
    async fn test_probe_deletes_owned_resources_and_is_idempotent() {
        let ops = FakeDynamicOps::default();
        ops.seed(
            CreatedResourceKind::ServiceAccount,
            Some("ns"),
            "foo-ns-sa",
            annotations(&[(PKG_ANNOTATION, "foo-ns")]),
        );
        ops.seed(
            CreatedResourceKind::ClusterRoleBinding,
            None,
            "foo-ns-cluster-rolebinding",
            annotations(&[(PKG_ANNOTATION, "foo-ns")]),
        );
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        cleaner.delete_orphaned_resources(&mut sink).await.unwrap();
        assert_eq!(ops.delete_calls().len(), 2);

        // Second run finds nothing left to do
        cleaner.delete_orphaned_resources(&mut sink).await.unwrap();
        assert_eq!(ops.delete_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_probe_accepts_legacy_ownership_annotation() {
        let ops = FakeDynamicOps::default();
        ops.seed(
            CreatedResourceKind::ClusterRole,
            None,
            "foo-ns-cluster-role",
            annotations(&[(LEGACY_PKG_ANNOTATION, "foo-ns")]),
        );
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        cleaner.delete_orphaned_resources(&mut sink).await.unwrap();

        assert_eq!(
            ops.delete_calls(),
            vec![(
                "clusterroles".to_string(),
                String::new(),
                "foo-ns-cluster-role".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_probe_skips_unannotated_resource() {
        let ops = FakeDynamicOps::default();
        ops.seed(
            CreatedResourceKind::ServiceAccount,
            Some("ns"),
            "foo-ns-sa",
            BTreeMap::new(),
        );
        let cleaner = ResourceCleaner::new(&ops, "foo", "ns");
        let mut sink = RecordingSink::default();

        cleaner.delete_orphaned_resources(&mut sink).await.unwrap();

        assert!(ops.delete_calls().is_empty());
    }
}
