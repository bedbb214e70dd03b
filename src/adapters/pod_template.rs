//! Backup worker Pod template
//!
//! Converts an `EtcdBackup` spec into the Pod that performs the backup.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::EtcdBackup;
use crate::error::{Error, Result};

/// Name of the single container in the backup Pod
pub const BACKUP_CONTAINER_NAME: &str = "etcd-backup";

const CPU_REQUEST: &str = "100m";
const MEMORY_REQUEST: &str = "100Mi";
const CPU_LIMIT: &str = "500m";
const MEMORY_LIMIT: &str = "500Mi";

/// Build the desired backup Pod for an EtcdBackup.
///
/// The Pod shares the backup's name and namespace and carries a controller
/// owner reference back to it, so deleting the backup garbage-collects the
/// Pod. Output depends only on the backup's identity and spec.
pub fn backup_pod(backup: &EtcdBackup) -> Result<Pod> {
    let owner = backup.controller_owner_ref(&()).ok_or_else(|| {
        Error::validation(format!(
            "EtcdBackup '{}' has no name or uid, cannot set owner reference",
            backup.name_any()
        ))
    })?;

    let labels = BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            "etcd-backup".to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            "etcd-backup-operator".to_string(),
        ),
        ("etcd.oschina.cn/backup".to_string(), backup.name_any()),
    ]);

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(backup.name_any()),
            namespace: backup.namespace(),
            labels: Some(labels),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: BACKUP_CONTAINER_NAME.to_string(),
                image: Some(backup.spec.image.clone()),
                args: Some(vec![
                    "--etcd-endpoints".to_string(),
                    backup.spec.endpoints.clone(),
                ]),
                resources: Some(ResourceRequirements {
                    requests: Some(resource_list(CPU_REQUEST, MEMORY_REQUEST)),
                    limits: Some(resource_list(CPU_LIMIT, MEMORY_LIMIT)),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            restart_policy: Some("Never".to_string()),
            ..Default::default()
        }),
        status: None,
    })
}

fn resource_list(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::EtcdBackupSpec;

    fn sample_backup() -> EtcdBackup {
        let mut backup = EtcdBackup::new(
            "nightly",
            EtcdBackupSpec {
                image: "registry.local/etcd-backup:v1".to_string(),
                endpoints: "10.0.0.1:2379".to_string(),
            },
        );
        backup.metadata.namespace = Some("kube-system".to_string());
        backup.metadata.uid = Some("uid-123".to_string());
        backup
    }

    #[test]
    fn pod_shares_backup_identity() {
        let pod = backup_pod(&sample_backup()).unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("nightly"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("kube-system"));
    }

    #[test]
    fn pod_has_controller_owner_reference() {
        let pod = backup_pod(&sample_backup()).unwrap();
        let refs = pod.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "EtcdBackup");
        assert_eq!(refs[0].api_version, "etcd.oschina.cn/v1alpha1");
        assert_eq!(refs[0].name, "nightly");
        assert_eq!(refs[0].uid, "uid-123");
        assert_eq!(refs[0].controller, Some(true));
        assert_eq!(refs[0].block_owner_deletion, Some(true));
    }

    #[test]
    fn container_passes_endpoints_as_args() {
        let pod = backup_pod(&sample_backup()).unwrap();
        let spec = pod.spec.unwrap();
        assert_eq!(spec.containers.len(), 1);

        let container = &spec.containers[0];
        assert_eq!(container.name, BACKUP_CONTAINER_NAME);
        assert_eq!(
            container.image.as_deref(),
            Some("registry.local/etcd-backup:v1")
        );
        assert_eq!(
            container.args.clone().unwrap(),
            vec!["--etcd-endpoints", "10.0.0.1:2379"]
        );
    }

    #[test]
    fn pod_runs_to_completion_with_fixed_resources() {
        let pod = backup_pod(&sample_backup()).unwrap();
        let spec = pod.spec.unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));

        let resources = spec.containers[0].resources.clone().unwrap();
        let requests = resources.requests.unwrap();
        let limits = resources.limits.unwrap();
        assert_eq!(requests["cpu"], Quantity("100m".to_string()));
        assert_eq!(requests["memory"], Quantity("100Mi".to_string()));
        assert_eq!(limits["cpu"], Quantity("500m".to_string()));
        assert_eq!(limits["memory"], Quantity("500Mi".to_string()));
    }

    #[test]
    fn same_spec_builds_identical_pod() {
        let backup = sample_backup();
        let first = serde_json::to_string(&backup_pod(&backup).unwrap()).unwrap();
        let second = serde_json::to_string(&backup_pod(&backup).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_uid_is_rejected() {
        let mut backup = sample_backup();
        backup.metadata.uid = None;
        let err = backup_pod(&backup).unwrap_err();
        assert!(err.to_string().contains("owner reference"));
    }
}
