//! EtcdBackup Custom Resource Definition

use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// EtcdBackup resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "etcd.oschina.cn",
    version = "v1alpha1",
    kind = "EtcdBackup",
    plural = "etcdbackups",
    singular = "etcdbackup",
    shortname = "eb",
    namespaced,
    status = "EtcdBackupStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Image", "type": "string", "jsonPath": ".spec.image", "priority": 1}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EtcdBackupSpec {
    /// Image of the backup worker
    pub image: String,

    /// etcd client endpoints, comma separated (e.g. "10.0.0.1:2379,10.0.0.2:2379")
    pub endpoints: String,
}

/// EtcdBackup status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EtcdBackupStatus {
    /// Current phase ("", BackingUp, Failed, Completed)
    #[serde(default)]
    pub phase: EtcdBackupPhase,
}

/// Backup lifecycle phase
///
/// Moves one way only: `Unset -> BackingUp -> {Failed, Completed}`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum EtcdBackupPhase {
    /// Freshly created, not yet picked up
    #[default]
    #[serde(rename = "")]
    Unset,
    /// Backup Pod has been (or is about to be) launched
    BackingUp,
    /// Backup Pod failed
    Failed,
    /// Backup Pod succeeded
    Completed,
}

impl EtcdBackupPhase {
    /// Failed and Completed are absorbing
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }

    /// Wire representation used in `status.phase`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::BackingUp => "BackingUp",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for EtcdBackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EtcdBackup {
    /// Current phase; a missing status reads as `Unset`
    pub fn phase(&self) -> EtcdBackupPhase {
        self.status
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or_default()
    }

    /// Whether deletion of this resource has been requested
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Copy of this resource with its phase replaced
    pub fn with_phase(&self, phase: EtcdBackupPhase) -> EtcdBackup {
        let mut updated = self.clone();
        updated.status.get_or_insert_with(Default::default).phase = phase;
        updated
    }
}
