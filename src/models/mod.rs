//! Data model layer
//!
//! Rust types for the packaging API: the `PackageInstall` and
//! `PackageRepository` custom resources, the generic condition/status shape
//! the controller reports through, and the registry of resource kinds a
//! package install creates as side effects.

mod created_resource_kind;
mod package_install;
mod package_repository;
mod status;

/// API group served by the packaging controller.
pub const API_GROUP: &str = "packaging.pkgctl.dev";

/// API version of the packaging custom resources.
pub const API_VERSION: &str = "v1alpha1";

pub use created_resource_kind::{
    install_identity, CreatedResourceKind, LEGACY_PKG_ANNOTATION, PKG_ANNOTATION,
};
pub use package_install::{
    package_install_description, PackageInstall, PackageInstallSpec, PackageInstallStatus,
    PackageRef, VersionSelection,
};
pub use package_repository::{
    package_repository_description, ImgpkgBundle, PackageRepository, PackageRepositorySpec,
    PackageRepositoryStatus, RepositoryFetch,
};
pub use status::{Condition, ConditionStatus, ConditionType, GenericStatus, ObservedResource};
