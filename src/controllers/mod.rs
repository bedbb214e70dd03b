//! Kubernetes controllers for etcd Backup CRDs
//!
//! This module contains the controller implementation that watches for CRD
//! and Pod changes and triggers reconciliation.

mod backup_controller;

pub use backup_controller::run as run_backup_controller;

use std::sync::Arc;

use kube::Client;

use crate::adapters::{BackupClient, KubeBackupClient};

/// Shared context for all controllers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// API operations used by the reconciler (trait object for testability)
    pub backups: Arc<dyn BackupClient>,
}

impl Context {
    /// Create a new context
    pub fn new(client: Client) -> Self {
        Self {
            backups: Arc::new(KubeBackupClient::new(client.clone())),
            client,
        }
    }
}
