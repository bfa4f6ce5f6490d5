//! pkgctl - controller-client for a Kubernetes packaging layer
//!
//! The packaging controller reconciles `PackageInstall` and
//! `PackageRepository` custom resources asynchronously, so every mutating
//! command here only submits intent. The crate supplies the two client-side
//! halves that make that usable: a wait state machine that polls a resource's
//! status until it reaches a terminal condition, and ownership-tracked
//! cleanup of the side-effect resources an install leaves behind.

pub mod cleanup;
pub mod cli;
pub mod kube;
pub mod models;
pub mod wait;
