//! Side-effecting actions chosen by the phase state machine

use std::fmt;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::info;

use crate::adapters::BackupClient;
use crate::crd::{EtcdBackup, EtcdBackupPhase};
use crate::error::{Error, Result};

/// A single control-plane mutation
#[derive(Clone, Debug)]
pub enum BackupAction {
    /// Create the backup Pod
    CreatePod(Pod),
    /// Move the backup to the phase carried by `updated`
    PatchStatus {
        original: EtcdBackup,
        updated: EtcdBackup,
    },
}

/// What an executed action did, without its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    CreatePod,
    PatchPhase(EtcdBackupPhase),
}

impl ActionKind {
    /// Metric label for this kind of action
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreatePod => "create_pod",
            Self::PatchPhase(_) => "patch_status",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatePod => write!(f, "CreatePod"),
            Self::PatchPhase(phase) => write!(f, "PatchStatus({})", phase),
        }
    }
}

impl BackupAction {
    /// Kind of this action
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreatePod(_) => ActionKind::CreatePod,
            Self::PatchStatus { updated, .. } => ActionKind::PatchPhase(updated.phase()),
        }
    }

    /// Apply the action.
    ///
    /// Pod creation treats an existing Pod as success: two overlapping
    /// passes can both see no Pod and both try to create it. A status
    /// conflict is returned as-is; the next pass re-reads and decides again.
    pub async fn execute(self, client: &dyn BackupClient) -> Result<()> {
        match self {
            Self::CreatePod(pod) => match client.create_pod(&pod).await {
                Ok(()) => {
                    info!(
                        pod = %pod.name_any(),
                        namespace = pod.namespace().as_deref().unwrap_or("default"),
                        "Created backup Pod"
                    );
                    Ok(())
                }
                Err(Error::AlreadyExists(what)) => {
                    info!(%what, "Backup Pod already exists, nothing to create");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Self::PatchStatus { original, updated } => {
                client.patch_backup_status(&original, &updated).await?;
                info!(
                    name = %original.name_any(),
                    from = %original.phase(),
                    to = %updated.phase(),
                    "Updated EtcdBackup phase"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockBackupClient;
    use crate::crd::EtcdBackupSpec;

    fn sample_backup() -> EtcdBackup {
        let mut backup = EtcdBackup::new(
            "nightly",
            EtcdBackupSpec {
                image: "etcd-backup:v1".to_string(),
                endpoints: "10.0.0.1:2379".to_string(),
            },
        );
        backup.metadata.namespace = Some("default".to_string());
        backup.metadata.resource_version = Some("7".to_string());
        backup
    }

    #[tokio::test]
    async fn create_pod_issues_one_create() {
        let mut client = MockBackupClient::new();
        client.expect_create_pod().times(1).returning(|_| Ok(()));

        BackupAction::CreatePod(Pod::default())
            .execute(&client)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_pod_tolerates_already_exists() {
        let mut client = MockBackupClient::new();
        client
            .expect_create_pod()
            .times(1)
            .returning(|_| Err(Error::AlreadyExists("Pod default/nightly".to_string())));

        let result = BackupAction::CreatePod(Pod::default()).execute(&client).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn create_pod_surfaces_other_errors() {
        let mut client = MockBackupClient::new();
        client
            .expect_create_pod()
            .returning(|_| Err(Error::validation("Pod must be namespaced")));

        let result = BackupAction::CreatePod(Pod::default()).execute(&client).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn patch_status_sends_original_and_updated() {
        let original = sample_backup();
        let updated = original.with_phase(EtcdBackupPhase::BackingUp);

        let mut client = MockBackupClient::new();
        client
            .expect_patch_backup_status()
            .withf(|original, updated| {
                original.metadata.resource_version.as_deref() == Some("7")
                    && original.phase() == EtcdBackupPhase::Unset
                    && updated.phase() == EtcdBackupPhase::BackingUp
            })
            .times(1)
            .returning(|_, _| Ok(()));

        BackupAction::PatchStatus { original, updated }
            .execute(&client)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn patch_status_conflict_is_not_retried() {
        let original = sample_backup();
        let updated = original.with_phase(EtcdBackupPhase::Completed);

        let mut client = MockBackupClient::new();
        client
            .expect_patch_backup_status()
            .times(1)
            .returning(|_, _| Err(Error::Conflict("EtcdBackup default/nightly".to_string())));

        let err = BackupAction::PatchStatus { original, updated }
            .execute(&client)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn kind_reports_target_phase() {
        let original = sample_backup();
        let action = BackupAction::PatchStatus {
            updated: original.with_phase(EtcdBackupPhase::Failed),
            original,
        };
        assert_eq!(action.kind(), ActionKind::PatchPhase(EtcdBackupPhase::Failed));
        assert_eq!(action.kind().label(), "patch_status");
        assert_eq!(action.kind().to_string(), "PatchStatus(Failed)");
        assert_eq!(BackupAction::CreatePod(Pod::default()).kind().label(), "create_pod");
    }
}
