//! Created-resource registry tests
//!
//! Tests to ensure kind mapping and annotation parsing stay consistent when
//! kinds are added to the registry.

use pkgctl::models::{CreatedResourceKind, LEGACY_PKG_ANNOTATION, PKG_ANNOTATION};

#[test]
fn test_every_kind_is_fully_mapped() {
    for kind in CreatedResourceKind::all() {
        assert!(!kind.plural().is_empty(), "{} should have a plural", kind);

        let resource = kind.api_resource();
        assert_eq!(resource.kind, kind.as_str());
        assert_eq!(resource.plural, kind.plural());
        assert!(
            !resource.api_version.is_empty(),
            "{} should have an apiVersion",
            kind
        );

        // Probe names must be unambiguous across installs and namespaces
        let name = kind.object_name("foo", "ns");
        assert!(name.contains("foo"), "{} name should embed install", kind);
        assert!(name.contains("ns"), "{} name should embed namespace", kind);
        assert_ne!(
            name,
            kind.object_name("foo", "other"),
            "{} name should vary by namespace",
            kind
        );
    }
}

#[test]
fn test_expected_kinds_are_registered() {
    let expected = vec![
        "ServiceAccount",
        "Secret",
        "ConfigMap",
        "ClusterRole",
        "ClusterRoleBinding",
    ];

    for kind_name in expected {
        let found = CreatedResourceKind::all()
            .iter()
            .any(|kind| kind.as_str() == kind_name);
        assert!(found, "Kind {} should be in the registry", kind_name);
    }
}

#[test]
fn test_annotation_keys_round_trip_under_both_prefixes() {
    for kind in CreatedResourceKind::all() {
        let current = format!("{}-{}", PKG_ANNOTATION, kind.as_str());
        assert_eq!(
            CreatedResourceKind::from_annotation_key(&current),
            Some(*kind),
            "current-prefix key for {} should parse",
            kind
        );

        let legacy = format!("{}-{}", LEGACY_PKG_ANNOTATION, kind.as_str());
        assert_eq!(
            CreatedResourceKind::from_annotation_key(&legacy),
            Some(*kind),
            "legacy-prefix key for {} should parse",
            kind
        );
    }
}

#[test]
fn test_rbac_kinds_are_cluster_scoped() {
    for kind in CreatedResourceKind::all() {
        let rbac = !kind.api_resource().group.is_empty();
        assert_eq!(
            kind.cluster_scoped(),
            rbac,
            "{} scope should match its API group",
            kind
        );
    }
}
