//! EtcdBackup phase state machine
//!
//! Decides which single action, if any, moves the observed state toward
//! the desired one. Rules are evaluated top to bottom and the first match
//! wins. Guards overlap on purpose: terminal phases must be checked before
//! the Pod outcome is looked at.

use tracing::info;

use crate::crd::{EtcdBackup, EtcdBackupPhase};
use crate::reconcilers::action::BackupAction;
use crate::reconcilers::state::ObservedState;

/// Pod phase reported by the kubelet once the container exited non-zero
const POD_FAILED: &str = "Failed";
/// Pod phase reported by the kubelet once the container exited zero
const POD_SUCCEEDED: &str = "Succeeded";

/// One guarded rule of the state machine
struct Rule {
    name: &'static str,
    message: &'static str,
    applies: fn(&ObservedState) -> bool,
    action: fn(&ObservedState) -> Option<BackupAction>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "backup-gone",
        message: "EtcdBackup not found",
        applies: |s| s.backup.is_none(),
        action: no_action,
    },
    Rule {
        name: "deletion-requested",
        message: "EtcdBackup is being deleted, leaving cleanup to garbage collection",
        applies: |s| s.backup.as_ref().is_some_and(EtcdBackup::is_deleting),
        action: no_action,
    },
    Rule {
        name: "start",
        message: "Backup starting",
        applies: |s| phase_is(s, EtcdBackupPhase::Unset),
        action: |s| patch_phase(s, EtcdBackupPhase::BackingUp),
    },
    Rule {
        name: "already-failed",
        message: "Backup has failed, ignoring",
        applies: |s| phase_is(s, EtcdBackupPhase::Failed),
        action: no_action,
    },
    Rule {
        name: "already-completed",
        message: "Backup has completed, ignoring",
        applies: |s| phase_is(s, EtcdBackupPhase::Completed),
        action: no_action,
    },
    Rule {
        name: "create-pod",
        message: "Backup Pod does not exist, creating",
        applies: |s| s.actual.is_none(),
        action: |s| s.desired.clone().map(BackupAction::CreatePod),
    },
    Rule {
        name: "pod-failed",
        message: "Backup Pod failed",
        applies: |s| s.pod_phase() == Some(POD_FAILED),
        action: |s| patch_phase(s, EtcdBackupPhase::Failed),
    },
    Rule {
        name: "pod-succeeded",
        message: "Backup Pod succeeded",
        applies: |s| s.pod_phase() == Some(POD_SUCCEEDED),
        action: |s| patch_phase(s, EtcdBackupPhase::Completed),
    },
    Rule {
        name: "pod-in-progress",
        message: "Backup Pod still running, waiting",
        applies: |_| true,
        action: no_action,
    },
];

/// Choose at most one action for the observed state
pub fn decide(state: &ObservedState) -> Option<BackupAction> {
    let rule = RULES.iter().find(|rule| (rule.applies)(state))?;
    info!(rule = rule.name, "{}", rule.message);
    (rule.action)(state)
}

fn no_action(_: &ObservedState) -> Option<BackupAction> {
    None
}

fn phase_is(state: &ObservedState, phase: EtcdBackupPhase) -> bool {
    state.backup.as_ref().is_some_and(|b| b.phase() == phase)
}

fn patch_phase(state: &ObservedState, phase: EtcdBackupPhase) -> Option<BackupAction> {
    let original = state.backup.as_ref()?;
    Some(BackupAction::PatchStatus {
        updated: original.with_phase(phase),
        original: original.clone(),
    })
}
