pub mod auction;
pub mod config;
pub mod consensus;
pub mod error;
pub mod governance;
pub mod handoff;
pub mod logging;

pub use auction::{
    AuctionMarket, AuctionStatus, AuctionStatusView, Bid, BidOutcome, RegisteredParticipant,
    RejectReason, TaskAuction,
};
pub use config::{
    AppConfig, AuctionConfig, GovernanceConfig, HandoffDefaults, LoggingConfig, VotingConfig,
};
pub use consensus::{
    ConsensusDecision, ConsensusEngine, Vote, VoteCollector, VoteDecision, VoteTally,
    VotingResult, VotingStrategy,
};
pub use error::{ConcordError, Result};
pub use governance::{
    AuditRecord, AuditSink, ChannelAuditSink, ConstitutionalGuard, TracingAuditSink,
};
pub use handoff::{
    CapturedState, HandoffConfig, HandoffCoordinator, HandoffHooks, HandoffResult, HandoffStage,
    HandoffStatus, NoopHooks,
};
