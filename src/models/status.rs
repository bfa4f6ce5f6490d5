//! Generic status shape reported by the packaging controller
//!
//! Every watched resource carries a generation counter pair plus an ordered
//! condition list. The wait loop must never judge conditions from a stale
//! generation: `observedGeneration` has to catch up to `generation` before
//! the conditions describe the spec the caller just wrote.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Condition types stamped by the packaging controller.
///
/// Newer controllers may report types this client version does not know
/// about; those are carried through as [`ConditionType::Unknown`] so a wait
/// can still display them without failing to decode the status.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConditionType {
    Reconciling,
    ReconcileSucceeded,
    ReconcileFailed,
    Deleting,
    DeleteFailed,
    /// A condition type this client version does not recognize.
    Unknown(String),
}

impl ConditionType {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionType::Reconciling => "Reconciling",
            ConditionType::ReconcileSucceeded => "ReconcileSucceeded",
            ConditionType::ReconcileFailed => "ReconcileFailed",
            ConditionType::Deleting => "Deleting",
            ConditionType::DeleteFailed => "DeleteFailed",
            ConditionType::Unknown(other) => other,
        }
    }
}

impl From<String> for ConditionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Reconciling" => ConditionType::Reconciling,
            "ReconcileSucceeded" => ConditionType::ReconcileSucceeded,
            "ReconcileFailed" => ConditionType::ReconcileFailed,
            "Deleting" => ConditionType::Deleting,
            "DeleteFailed" => ConditionType::DeleteFailed,
            _ => ConditionType::Unknown(s),
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ConditionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConditionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ConditionType::from(String::deserialize(deserializer)?))
    }
}

/// Tri-state condition status as reported on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// A single entry in a resource's ordered condition list.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Status fields common to every resource the controller reconciles.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericStatus {
    /// Generation last acknowledged by the controller.
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// One-line human summary of the current reconciliation state.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub friendly_description: String,
    /// Tail of the deploy/fetch output when reconciliation failed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub useful_error_message: String,
}

/// A resource whose reconciliation progress can be observed.
pub trait ObservedResource {
    /// Generation set by the API server on every spec change.
    fn generation(&self) -> i64;

    /// Controller-reported status, absent until first reconciliation.
    fn status(&self) -> Option<&GenericStatus>;
}
