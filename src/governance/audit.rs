//! Coordination audit sink
//!
//! Engines forward every terminal outcome (voting result, auction award,
//! handoff result) to a sink for traceability. Emission is fire-and-forget:
//! the trait method is synchronous and infallible, and the engines never
//! block on delivery.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A serialized outcome record produced by one of the engines
#[derive(Debug, Clone)]
pub enum AuditRecord {
    Voting(Value),
    Auction(Value),
    Handoff(Value),
}

impl AuditRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            AuditRecord::Voting(_) => "voting",
            AuditRecord::Auction(_) => "auction",
            AuditRecord::Handoff(_) => "handoff",
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            AuditRecord::Voting(v) | AuditRecord::Auction(v) | AuditRecord::Handoff(v) => v,
        }
    }
}

/// Receives structured outcome records; implementations must not block
pub trait AuditSink: Send + Sync {
    fn emit(&self, record: AuditRecord);
}

/// Default sink: logs records under the `concord::audit` target
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, record: AuditRecord) {
        info!(
            target: "concord::audit",
            kind = record.kind(),
            record = %record.payload(),
            "coordination outcome"
        );
    }
}

/// Sink forwarding records into an unbounded channel.
///
/// Used by platform collectors and tests. A dropped receiver is ignored;
/// audit delivery never fails the producing operation.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl ChannelAuditSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn emit(&self, record: AuditRecord) {
        if self.tx.send(record).is_err() {
            debug!("audit receiver dropped, record discarded");
        }
    }
}
