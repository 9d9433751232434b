//! Collaborator hooks for the handoff state machine
//!
//! External capture/transfer/verify/rollback callables become one trait
//! with pass-through defaults, so callers without collaborators can hand
//! the coordinator a `NoopHooks`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::Result;

/// One captured-state snapshot, set exactly once before transfer.
///
/// Owned by a single handoff execution and released when the workflow
/// terminates; never null during transfer or verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedState {
    pub task_id: String,
    pub source_id: String,
    pub captured_at: DateTime<Utc>,
    pub compliance_token: String,
    pub state: Value,
}

/// External collaborators invoked by the handoff stages.
///
/// Each bounded call gets a quarter of the overall handoff budget. Defaults
/// pass through: capture returns the blob unchanged, transfer and rollback
/// succeed, verification reports verified.
#[async_trait]
pub trait HandoffHooks: Send + Sync {
    /// Capture the task's state at the source.
    async fn capture_state(&self, task_id: &str, state: Value) -> Result<Value> {
        trace!(%task_id, "default capture: passing state through");
        Ok(state)
    }

    /// Push the captured snapshot to the target.
    async fn transfer_state(&self, target_id: &str, state: &CapturedState) -> Result<()> {
        trace!(%target_id, task_id = %state.task_id, "default transfer: simulated success");
        Ok(())
    }

    /// Confirm the target holds a usable copy of the state.
    async fn verify_transfer(&self, target_id: &str, state: &CapturedState) -> Result<bool> {
        trace!(%target_id, task_id = %state.task_id, "default verification: verified");
        Ok(true)
    }

    /// Compensate a partially completed handoff. Receives the captured
    /// snapshot when capture had succeeded.
    async fn rollback(&self, source_id: &str, state: Option<&CapturedState>) -> Result<()> {
        trace!(%source_id, captured = state.is_some(), "default rollback: no-op");
        Ok(())
    }
}

/// Hooks for callers without external collaborators
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

#[async_trait]
impl HandoffHooks for NoopHooks {}
