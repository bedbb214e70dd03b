//! Custom Resource Definitions for the etcd Backup Operator

mod etcd_backup;

pub use etcd_backup::*;

use kube::CustomResourceExt;

/// Generate all CRD YAML manifests
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![serde_yaml::to_string(&EtcdBackup::crd())?])
}
