//! Reconciler for EtcdBackup resources
//!
//! A reconcile pass is level-triggered and runs in three steps:
//! - Read the backup, its Pod, and the desired Pod ([`state`])
//! - Pick at most one action from the phase state machine ([`phase`])
//! - Execute that action against the API server ([`action`])
//!
//! Nothing is cached between passes and nothing is retried within a pass;
//! retries come from the caller re-invoking the reconciler.

pub mod action;
pub mod phase;
pub mod state;

pub use action::{ActionKind, BackupAction};
pub use phase::decide;
pub use state::{read_state, ObservedState};

use tracing::debug;

use crate::adapters::{BackupClient, BackupKey};
use crate::error::Result;

/// Run one reconcile pass for the backup identified by `key`.
///
/// Returns the kind of action that was applied, or `None` if the observed
/// state needed no change.
pub async fn reconcile(client: &dyn BackupClient, key: &BackupKey) -> Result<Option<ActionKind>> {
    let state = read_state(client, key).await?;

    let Some(action) = decide(&state) else {
        debug!(backup = %key, "No action required");
        return Ok(None);
    };

    let kind = action.kind();
    action.execute(client).await?;
    Ok(Some(kind))
}
