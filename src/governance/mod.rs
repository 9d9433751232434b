//! Governance collaborators for the coordination engines.
//!
//! Two leaf components the engines depend on:
//! - `ConstitutionalGuard` validates the fixed compliance token before any
//!   coordination work begins.
//! - `AuditSink` receives serialized outcome records; the engines never block
//!   on it succeeding.

pub mod audit;
pub mod guard;

pub use audit::{AuditRecord, AuditSink, ChannelAuditSink, TracingAuditSink};
pub use guard::ConstitutionalGuard;
