//! EtcdBackup controller
//!
//! Watches EtcdBackup resources and the Pods they own, and triggers
//! reconciliation. The controller runtime serializes passes per object and
//! runs passes for different objects concurrently.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use crate::adapters::BackupKey;
use crate::controllers::Context;
use crate::crd::EtcdBackup;
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::{self as backup_reconciler, ActionKind};

const KIND: &str = "EtcdBackup";

/// Label selecting Pods created by this operator
const MANAGED_POD_SELECTOR: &str = "app.kubernetes.io/managed-by=etcd-backup-operator";

/// Run the EtcdBackup controller
///
/// Watches a single namespace when `namespace` is set, otherwise all.
pub async fn run(client: Client, context: Arc<Context>, namespace: Option<String>) {
    let (backups, pods): (Api<EtcdBackup>, Api<Pod>) = match namespace.as_deref() {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    // Verify CRD is installed
    if let Err(e) = backups.list(&ListParams::default().limit(1)).await {
        error!("EtcdBackup CRD not installed: {}", e);
        return;
    }

    info!(
        namespace = namespace.as_deref().unwrap_or("*"),
        "Starting EtcdBackup controller"
    );

    Controller::new(backups, WatcherConfig::default())
        .owns(pods, WatcherConfig::default().labels(MANAGED_POD_SELECTOR))
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled EtcdBackup"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Reconciliation error");
                }
            }
        })
        .await;
}

/// Main reconciliation function
///
/// The cached object only supplies the key; state is re-read from the API
/// server on every pass.
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<EtcdBackup>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let key = BackupKey::for_backup(&obj);
    if let Some(kind) = backup_reconciler::reconcile(ctx.backups.as_ref(), &key).await? {
        record_action(&key, kind);
    }

    // Pod status changes re-trigger us through the owner reference
    Ok(Action::await_change())
}

fn record_action(key: &BackupKey, kind: ActionKind) {
    metrics::ACTIONS_TOTAL
        .with_label_values(&[kind.label()])
        .inc();

    if let ActionKind::PatchPhase(phase) = kind {
        if phase.is_terminal() {
            metrics::BACKUPS_TOTAL
                .with_label_values(&[phase.as_str(), &key.namespace, &key.name])
                .inc();
        }
    }
}

/// Error policy for the controller
fn error_policy(obj: Arc<EtcdBackup>, error: &Error, _ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    let (reason, requeue_duration) = requeue_for(error);

    error!(
        name = %name,
        error = %error,
        reason,
        "Reconciliation failed, scheduling retry"
    );
    metrics::RECONCILIATION_ERRORS
        .with_label_values(&[KIND, reason])
        .inc();

    Action::requeue(requeue_duration)
}

/// Error reason label and requeue delay for a failed pass
fn requeue_for(error: &Error) -> (&'static str, Duration) {
    match error {
        // The conflicting write usually re-triggers us first
        Error::Conflict(_) => ("conflict", Duration::from_secs(5)),
        Error::Kube(_) => ("api", Duration::from_secs(30)),
        Error::Config(_) | Error::Validation(_) => ("invalid", Duration::from_secs(300)),
        _ => ("other", Duration::from_secs(30)),
    }
}
