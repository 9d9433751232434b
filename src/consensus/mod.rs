//! Consensus voting engine
//!
//! Collects votes from a set of eligible participants under a chosen
//! strategy and computes an approve/reject outcome. Collection fans out
//! concurrently with a per-participant timeout budget; individual failures
//! degrade the round to fewer votes instead of failing it.

pub mod engine;
pub mod strategy;
pub mod vote;

pub use engine::{ConsensusEngine, VoteCollector};
pub use strategy::VotingStrategy;
pub use vote::{ConsensusDecision, Vote, VoteDecision, VoteTally, VotingResult};
