//! Vote and voting-result value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consensus::strategy::VotingStrategy;
use crate::error::Result;

/// A participant's decision on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDecision {
    Approve,
    Reject,
    Abstain,
}

impl std::fmt::Display for VoteDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteDecision::Approve => write!(f, "approve"),
            VoteDecision::Reject => write!(f, "reject"),
            VoteDecision::Abstain => write!(f, "abstain"),
        }
    }
}

/// A single recorded vote. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub participant_id: String,
    pub decision: VoteDecision,
    /// Vote weight; configured participant weights override this
    pub weight: f64,
    pub reasoning: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    pub fn new(participant_id: impl Into<String>, decision: VoteDecision) -> Self {
        Self {
            participant_id: participant_id.into(),
            decision,
            weight: 1.0,
            reasoning: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Aggregate counts over one voting round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub total_eligible: usize,
    pub total_voted: usize,
    pub approvals: usize,
    pub rejections: usize,
    pub abstentions: usize,
    pub weighted_approvals: f64,
    pub total_weight: f64,
}

impl VoteTally {
    /// Tally a set of recorded votes against the eligible-set size.
    pub fn from_votes(votes: &[Vote], total_eligible: usize) -> Self {
        let mut tally = VoteTally {
            total_eligible,
            total_voted: votes.len(),
            ..Default::default()
        };
        for vote in votes {
            match vote.decision {
                VoteDecision::Approve => {
                    tally.approvals += 1;
                    tally.weighted_approvals += vote.weight;
                }
                VoteDecision::Reject => tally.rejections += 1,
                VoteDecision::Abstain => tally.abstentions += 1,
            }
            tally.total_weight += vote.weight;
        }
        tally
    }

    /// Participation ratio over the eligible set (0.0 when nobody is eligible)
    pub fn participation(&self) -> f64 {
        if self.total_eligible == 0 {
            0.0
        } else {
            self.total_voted as f64 / self.total_eligible as f64
        }
    }

    /// Approval ratio excluding abstentions (0.0 when no approve/reject votes)
    pub fn decisive_ratio(&self) -> f64 {
        let decisive = self.approvals + self.rejections;
        if decisive == 0 {
            0.0
        } else {
            self.approvals as f64 / decisive as f64
        }
    }

    /// Weighted approval ratio over all recorded votes
    pub fn weighted_ratio(&self) -> f64 {
        if self.total_weight <= 0.0 {
            0.0
        } else {
            self.weighted_approvals / self.total_weight
        }
    }
}

/// Outcome of one voting round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusDecision {
    Approved,
    Rejected,
}

impl std::fmt::Display for ConsensusDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusDecision::Approved => write!(f, "approved"),
            ConsensusDecision::Rejected => write!(f, "rejected"),
        }
    }
}

/// Result of one voting round. Created once; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingResult {
    pub voting_id: String,
    pub decision: ConsensusDecision,
    pub strategy: VotingStrategy,
    pub votes: Vec<Vote>,
    /// Weighted ratio under the weighted strategy, decisive ratio otherwise
    pub approval_rate: f64,
    pub quorum_met: bool,
    pub compliance_token: String,
    pub details: VoteTally,
}

impl VotingResult {
    /// Flat record for transport and audit
    pub fn to_record(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn approved(&self) -> bool {
        self.decision == ConsensusDecision::Approved
    }
}
