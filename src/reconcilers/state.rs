//! Observed state of an EtcdBackup and its backup Pod

use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use crate::adapters::{backup_pod, BackupClient, BackupKey};
use crate::crd::EtcdBackup;
use crate::error::Result;

/// Snapshot of everything a reconcile pass decides on.
///
/// Rebuilt from scratch on every pass and never cached between passes.
#[derive(Clone, Debug, Default)]
pub struct ObservedState {
    /// The EtcdBackup, or None if it no longer exists
    pub backup: Option<EtcdBackup>,
    /// The backup Pod as it currently exists, if any
    pub actual: Option<Pod>,
    /// The backup Pod as it should exist; present whenever `backup` is
    pub desired: Option<Pod>,
}

impl ObservedState {
    /// State for a backup and its (optional) running Pod
    pub fn new(backup: EtcdBackup, actual: Option<Pod>) -> Result<Self> {
        let desired = backup_pod(&backup)?;
        Ok(Self {
            backup: Some(backup),
            actual,
            desired: Some(desired),
        })
    }

    /// Phase reported by the actual Pod, if it exists and has one
    pub fn pod_phase(&self) -> Option<&str> {
        self.actual.as_ref()?.status.as_ref()?.phase.as_deref()
    }
}

/// Read the backup, its Pod, and compute the desired Pod.
///
/// A missing backup short-circuits with an empty state; a missing Pod is
/// recorded as `actual: None`. Any other read failure aborts the pass.
pub async fn read_state(client: &dyn BackupClient, key: &BackupKey) -> Result<ObservedState> {
    let Some(backup) = client.get_backup(key).await? else {
        debug!(backup = %key, "EtcdBackup not found");
        return Ok(ObservedState::default());
    };

    let actual = client.get_pod(key).await?;
    debug!(
        backup = %key,
        pod_exists = actual.is_some(),
        "Read backup Pod"
    );

    ObservedState::new(backup, actual)
}
