//! Stateful task handoff
//!
//! Moves a task and its captured state from a source participant to a
//! target participant through an ordered six-stage state machine, with a
//! compensating rollback attempt whenever a stage fails or verification
//! rejects the transfer.

pub mod coordinator;
pub mod hooks;

pub use coordinator::{
    HandoffConfig, HandoffCoordinator, HandoffResult, HandoffStage, HandoffStatus,
};
pub use hooks::{CapturedState, HandoffHooks, NoopHooks};
