//! Handoff coordinator: six-stage sequential state machine
//!
//! Stages run strictly in order; no stage begins before the previous one
//! commits. Capture, transfer, verification, and rollback are each bounded
//! by a quarter of the overall handoff budget, the whole pipeline by the
//! budget itself. Any stage failure or a rejected verification triggers a
//! rollback attempt; rollback failures are recorded, never raised.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ConcordError, Result};
use crate::governance::{AuditRecord, AuditSink, ConstitutionalGuard};
use crate::handoff::hooks::{CapturedState, HandoffHooks};

/// Ordered stages of a responsibility transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStage {
    Validation,
    StateCapture,
    TargetPreparation,
    StateTransfer,
    Verification,
    Completion,
}

impl std::fmt::Display for HandoffStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffStage::Validation => write!(f, "validation"),
            HandoffStage::StateCapture => write!(f, "state_capture"),
            HandoffStage::TargetPreparation => write!(f, "target_preparation"),
            HandoffStage::StateTransfer => write!(f, "state_transfer"),
            HandoffStage::Verification => write!(f, "verification"),
            HandoffStage::Completion => write!(f, "completion"),
        }
    }
}

/// Terminal and in-flight states of one handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

impl std::fmt::Display for HandoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandoffStatus::Pending => write!(f, "pending"),
            HandoffStatus::InProgress => write!(f, "in_progress"),
            HandoffStatus::Completed => write!(f, "completed"),
            HandoffStatus::Failed => write!(f, "failed"),
            HandoffStatus::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Outcome of one handoff execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffResult {
    pub handoff_id: String,
    pub status: HandoffStatus,
    pub source_id: String,
    pub target_id: String,
    pub state_transferred: bool,
    pub stages_completed: Vec<HandoffStage>,
    pub duration_secs: f64,
    pub compliance_token: String,
    pub errors: Vec<String>,
}

impl HandoffResult {
    /// Flat record for transport and audit
    pub fn to_record(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Per-instance handoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HandoffConfig {
    pub source_id: String,
    pub target_id: String,
    /// Overall budget; capture/transfer/verification/rollback each get a quarter
    pub handoff_timeout_secs: u64,
}

impl HandoffConfig {
    fn validate(&self) -> Result<()> {
        if self.source_id.is_empty() || self.target_id.is_empty() {
            return Err(ConcordError::Validation(
                "source and target IDs must be non-empty".to_string(),
            ));
        }
        if self.source_id == self.target_id {
            return Err(ConcordError::Validation(format!(
                "source and target must differ, both are {}",
                self.source_id
            )));
        }
        if self.handoff_timeout_secs == 0 {
            return Err(ConcordError::Validation(
                "handoff_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

enum PipelineOutcome {
    Completed,
    VerificationFailed,
    StageFailed { stage: HandoffStage, error: String },
}

/// Transfers one task's state from source to target, or rolls back
pub struct HandoffCoordinator {
    config: HandoffConfig,
    guard: Arc<ConstitutionalGuard>,
    sink: Arc<dyn AuditSink>,
}

impl HandoffCoordinator {
    pub fn new(
        config: HandoffConfig,
        guard: Arc<ConstitutionalGuard>,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            guard,
            sink,
        })
    }

    /// Execute the handoff for one task.
    ///
    /// Ordinary outcomes (completed, failed, rolled back) come back as a
    /// fully populated `HandoffResult`. Only validation problems and the
    /// overall budget elapsing surface as errors; the latter still attempts
    /// rollback first.
    pub async fn execute(
        &self,
        task_id: &str,
        state: Value,
        compliance_token: &str,
        hooks: Arc<dyn HandoffHooks>,
    ) -> Result<HandoffResult> {
        let handoff_id = Uuid::new_v4().to_string();
        let started = tokio::time::Instant::now();
        let overall = Duration::from_secs(self.config.handoff_timeout_secs);
        let stage_budget = overall / 4;

        // Stage 1: validation (synchronous, never rolled back)
        self.guard.verify(compliance_token)?;
        if task_id.is_empty() {
            return Err(ConcordError::Validation("task_id must be non-empty".to_string()));
        }
        let mut stages = vec![HandoffStage::Validation];
        let mut errors = Vec::new();
        let mut captured: Option<CapturedState> = None;

        info!(
            %handoff_id,
            %task_id,
            source = %self.config.source_id,
            target = %self.config.target_id,
            "handoff started"
        );

        let pipeline = self.run_pipeline(
            task_id,
            state,
            &hooks,
            stage_budget,
            &mut stages,
            &mut captured,
        );
        let outcome = match timeout(overall, pipeline).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%handoff_id, "handoff exceeded overall budget, rolling back");
                self.attempt_rollback(&hooks, captured.as_ref(), stage_budget, &mut errors)
                    .await;
                errors.push(format!(
                    "handoff exceeded {}s budget",
                    self.config.handoff_timeout_secs
                ));
                self.emit(&self.build_result(
                    &handoff_id,
                    HandoffStatus::Failed,
                    false,
                    stages,
                    started.elapsed(),
                    errors,
                ));
                return Err(ConcordError::Timeout {
                    operation: "handoff".to_string(),
                    budget_secs: self.config.handoff_timeout_secs as f64,
                });
            }
        };

        let (status, state_transferred) = match outcome {
            // Completion is the terminal status; stages_completed records the
            // five stages leading up to it
            PipelineOutcome::Completed => (HandoffStatus::Completed, true),
            PipelineOutcome::VerificationFailed => {
                errors.push("verification rejected the transferred state".to_string());
                self.attempt_rollback(&hooks, captured.as_ref(), stage_budget, &mut errors)
                    .await;
                (HandoffStatus::Failed, false)
            }
            PipelineOutcome::StageFailed { stage, error } => {
                warn!(%handoff_id, %stage, %error, "handoff stage failed");
                errors.push(format!("{stage}: {error}"));
                let rolled_back = self
                    .attempt_rollback(&hooks, captured.as_ref(), stage_budget, &mut errors)
                    .await;
                if rolled_back {
                    (HandoffStatus::RolledBack, false)
                } else {
                    (HandoffStatus::Failed, false)
                }
            }
        };

        // Snapshot is released with the workflow
        drop(captured);

        let result = self.build_result(
            &handoff_id,
            status,
            state_transferred,
            stages,
            started.elapsed(),
            errors,
        );
        info!(
            %handoff_id,
            status = %result.status,
            stages = result.stages_completed.len(),
            duration_secs = result.duration_secs,
            "handoff finished"
        );
        self.emit(&result);
        Ok(result)
    }

    /// Stages 2-5, strictly sequential.
    async fn run_pipeline(
        &self,
        task_id: &str,
        state: Value,
        hooks: &Arc<dyn HandoffHooks>,
        stage_budget: Duration,
        stages: &mut Vec<HandoffStage>,
        captured: &mut Option<CapturedState>,
    ) -> PipelineOutcome {
        // Stage 2: state capture; the snapshot is set exactly once
        let blob = match timeout(stage_budget, hooks.capture_state(task_id, state)).await {
            Ok(Ok(blob)) => blob,
            Ok(Err(e)) => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::StateCapture,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::StateCapture,
                    error: "state capture timed out".to_string(),
                }
            }
        };
        *captured = Some(CapturedState {
            task_id: task_id.to_string(),
            source_id: self.config.source_id.clone(),
            captured_at: chrono::Utc::now(),
            compliance_token: self.guard.token().to_string(),
            state: blob,
        });
        stages.push(HandoffStage::StateCapture);

        // Stage 3: target preparation; extension point for notifying the target
        debug!(target = %self.config.target_id, "target preparation");
        stages.push(HandoffStage::TargetPreparation);

        let snapshot = match captured.as_ref() {
            Some(snapshot) => snapshot,
            None => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::StateTransfer,
                    error: "captured state missing before transfer".to_string(),
                }
            }
        };

        // Stage 4: state transfer
        match timeout(
            stage_budget,
            hooks.transfer_state(&self.config.target_id, snapshot),
        )
        .await
        {
            Ok(Ok(())) => stages.push(HandoffStage::StateTransfer),
            Ok(Err(e)) => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::StateTransfer,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::StateTransfer,
                    error: "state transfer timed out".to_string(),
                }
            }
        }

        // Stage 5: verification; a false result never reaches completion
        match timeout(
            stage_budget,
            hooks.verify_transfer(&self.config.target_id, snapshot),
        )
        .await
        {
            Ok(Ok(true)) => stages.push(HandoffStage::Verification),
            Ok(Ok(false)) => return PipelineOutcome::VerificationFailed,
            Ok(Err(e)) => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::Verification,
                    error: e.to_string(),
                }
            }
            Err(_) => {
                return PipelineOutcome::StageFailed {
                    stage: HandoffStage::Verification,
                    error: "verification timed out".to_string(),
                }
            }
        }

        PipelineOutcome::Completed
    }

    /// Run the rollback hook, bounded; failures append to `errors` and are
    /// never raised. Returns whether the rollback itself succeeded.
    async fn attempt_rollback(
        &self,
        hooks: &Arc<dyn HandoffHooks>,
        captured: Option<&CapturedState>,
        stage_budget: Duration,
        errors: &mut Vec<String>,
    ) -> bool {
        match timeout(stage_budget, hooks.rollback(&self.config.source_id, captured)).await {
            Ok(Ok(())) => {
                debug!(source = %self.config.source_id, "rollback completed");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "rollback failed");
                errors.push(format!("rollback: {e}"));
                false
            }
            Err(_) => {
                warn!("rollback timed out");
                errors.push("rollback: timed out".to_string());
                false
            }
        }
    }

    fn build_result(
        &self,
        handoff_id: &str,
        status: HandoffStatus,
        state_transferred: bool,
        stages_completed: Vec<HandoffStage>,
        duration: Duration,
        errors: Vec<String>,
    ) -> HandoffResult {
        HandoffResult {
            handoff_id: handoff_id.to_string(),
            status,
            source_id: self.config.source_id.clone(),
            target_id: self.config.target_id.clone(),
            state_transferred,
            stages_completed,
            duration_secs: duration.as_secs_f64(),
            compliance_token: self.guard.token().to_string(),
            errors,
        }
    }

    fn emit(&self, result: &HandoffResult) {
        if let Ok(record) = result.to_record() {
            self.sink.emit(AuditRecord::Handoff(record));
        }
    }
}
