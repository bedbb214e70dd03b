//! Control-plane access for EtcdBackup reconciliation

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::crd::EtcdBackup;
use crate::error::{Error, Result};

/// Field manager recorded on writes made by the operator
pub const FIELD_MANAGER: &str = "etcd-backup-operator";

/// Namespace/name of an EtcdBackup, shared by its backup Pod
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackupKey {
    /// Namespace of the backup
    pub namespace: String,
    /// Name of the backup
    pub name: String,
}

impl BackupKey {
    /// Create a key from its parts
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing EtcdBackup
    pub fn for_backup(backup: &EtcdBackup) -> Self {
        Self::new(
            backup.namespace().unwrap_or_else(|| "default".to_string()),
            backup.name_any(),
        )
    }
}

impl fmt::Display for BackupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Trait abstracting the Kubernetes operations the reconciler needs
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production. Absence is reported as `Ok(None)`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupClient: Send + Sync {
    /// Get an EtcdBackup by key
    async fn get_backup(&self, key: &BackupKey) -> Result<Option<EtcdBackup>>;

    /// Get the backup Pod with the same key
    async fn get_pod(&self, key: &BackupKey) -> Result<Option<Pod>>;

    /// Create a Pod
    ///
    /// Returns [`Error::AlreadyExists`] if a Pod with that name exists.
    async fn create_pod(&self, pod: &Pod) -> Result<()>;

    /// Replace the status of `original` with the status of `updated`
    ///
    /// Conditioned on `original`'s resource version; returns
    /// [`Error::Conflict`] if the object changed in between.
    async fn patch_backup_status(&self, original: &EtcdBackup, updated: &EtcdBackup)
        -> Result<()>;
}

/// Production implementation of [`BackupClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeBackupClient {
    client: Client,
}

impl KubeBackupClient {
    /// Create a new KubeBackupClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackupClient for KubeBackupClient {
    async fn get_backup(&self, key: &BackupKey) -> Result<Option<EtcdBackup>> {
        let api: Api<EtcdBackup> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn get_pod(&self, key: &BackupKey) -> Result<Option<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn create_pod(&self, pod: &Pod) -> Result<()> {
        let namespace = pod
            .namespace()
            .ok_or_else(|| Error::validation("Pod must be namespaced"))?;
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);

        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        match api.create(&params, pod).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::AlreadyExists(format!(
                "Pod {}/{}",
                namespace,
                pod.name_any()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_backup_status(
        &self,
        original: &EtcdBackup,
        updated: &EtcdBackup,
    ) -> Result<()> {
        let key = BackupKey::for_backup(original);
        let api: Api<EtcdBackup> = Api::namespaced(self.client.clone(), &key.namespace);

        let patch = status_patch(original, updated);
        debug!(backup = %key, patch = %patch, "Patching EtcdBackup status");

        match api
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                Err(Error::Conflict(format!("EtcdBackup {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Merge patch carrying `updated`'s status, pinned to `original`'s version
fn status_patch(original: &EtcdBackup, updated: &EtcdBackup) -> serde_json::Value {
    let mut patch = json!({ "status": updated.status });
    if let Some(version) = original.resource_version() {
        patch["metadata"] = json!({ "resourceVersion": version });
    }
    patch
}
