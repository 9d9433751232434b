//! Voting strategies and their decision rules
//!
//! All rules are threshold-based, so ties resolve by the stated comparison
//! operator and no further tie-break is needed.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::consensus::vote::VoteTally;
use crate::error::ConcordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingStrategy {
    /// Approve iff approvals / (approvals + rejections) > 0.5
    #[default]
    Majority,
    /// Approve iff the same ratio > 0.66
    Supermajority,
    /// Approve iff there are no rejections and at least one approval
    Unanimous,
    /// Approve iff weighted approvals / total weight >= approval_threshold
    Weighted,
    /// Reject outright below quorum participation, else majority rule
    Quorum,
}

impl std::fmt::Display for VotingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingStrategy::Majority => write!(f, "majority"),
            VotingStrategy::Supermajority => write!(f, "supermajority"),
            VotingStrategy::Unanimous => write!(f, "unanimous"),
            VotingStrategy::Weighted => write!(f, "weighted"),
            VotingStrategy::Quorum => write!(f, "quorum"),
        }
    }
}

impl FromStr for VotingStrategy {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "majority" => Ok(VotingStrategy::Majority),
            "supermajority" => Ok(VotingStrategy::Supermajority),
            "unanimous" => Ok(VotingStrategy::Unanimous),
            "weighted" => Ok(VotingStrategy::Weighted),
            "quorum" => Ok(VotingStrategy::Quorum),
            other => Err(ConcordError::UnknownStrategy(other.to_string())),
        }
    }
}

impl VotingStrategy {
    /// Apply the decision rule to a tally.
    pub fn decide(
        &self,
        tally: &VoteTally,
        approval_threshold: f64,
        quorum_percentage: f64,
    ) -> bool {
        match self {
            VotingStrategy::Majority => tally.decisive_ratio() > 0.5,
            VotingStrategy::Supermajority => tally.decisive_ratio() > 0.66,
            VotingStrategy::Unanimous => tally.rejections == 0 && tally.approvals > 0,
            VotingStrategy::Weighted => tally.weighted_ratio() >= approval_threshold,
            VotingStrategy::Quorum => {
                if tally.participation() < quorum_percentage {
                    false
                } else {
                    tally.decisive_ratio() > 0.5
                }
            }
        }
    }

    /// The approval rate the strategy reports on its result.
    pub fn approval_rate(&self, tally: &VoteTally) -> f64 {
        match self {
            VotingStrategy::Weighted => tally.weighted_ratio(),
            _ => tally.decisive_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::vote::{Vote, VoteDecision};

    fn tally(votes: &[Vote], eligible: usize) -> VoteTally {
        VoteTally::from_votes(votes, eligible)
    }

    #[test]
    fn test_majority_two_of_three_approves() {
        let votes = vec![
            Vote::new("a", VoteDecision::Approve),
            Vote::new("b", VoteDecision::Approve),
            Vote::new("c", VoteDecision::Reject),
        ];
        assert!(VotingStrategy::Majority.decide(&tally(&votes, 3), 0.66, 0.5));
    }

    #[test]
    fn test_majority_exact_half_rejects() {
        // 1 approve / 1 reject / 1 abstain: ratio is exactly 0.5, strict >
        let votes = vec![
            Vote::new("a", VoteDecision::Approve),
            Vote::new("b", VoteDecision::Reject),
            Vote::new("c", VoteDecision::Abstain),
        ];
        assert!(!VotingStrategy::Majority.decide(&tally(&votes, 3), 0.66, 0.5));
    }

    #[test]
    fn test_supermajority_boundary() {
        let votes = vec![
            Vote::new("a", VoteDecision::Approve),
            Vote::new("b", VoteDecision::Approve),
            Vote::new("c", VoteDecision::Reject),
        ];
        // 0.667 > 0.66
        assert!(VotingStrategy::Supermajority.decide(&tally(&votes, 3), 0.66, 0.5));

        let votes = vec![
            Vote::new("a", VoteDecision::Approve),
            Vote::new("b", VoteDecision::Reject),
        ];
        assert!(!VotingStrategy::Supermajority.decide(&tally(&votes, 2), 0.66, 0.5));
    }

    #[test]
    fn test_unanimous_requires_at_least_one_approval() {
        // All abstain: no rejections, but no vacuous approval either
        let votes = vec![
            Vote::new("a", VoteDecision::Abstain),
            Vote::new("b", VoteDecision::Abstain),
        ];
        assert!(!VotingStrategy::Unanimous.decide(&tally(&votes, 2), 0.66, 0.5));

        let votes = vec![Vote::new("a", VoteDecision::Approve)];
        assert!(VotingStrategy::Unanimous.decide(&tally(&votes, 1), 0.66, 0.5));
    }

    #[test]
    fn test_quorum_rejects_below_participation() {
        // 10 eligible, 4 voted (all approve), quorum 0.5: rejected outright
        let votes: Vec<Vote> = (0..4)
            .map(|i| Vote::new(format!("p{i}"), VoteDecision::Approve))
            .collect();
        assert!(!VotingStrategy::Quorum.decide(&tally(&votes, 10), 0.66, 0.5));
    }

    #[test]
    fn test_quorum_falls_back_to_majority() {
        let votes = vec![
            Vote::new("a", VoteDecision::Approve),
            Vote::new("b", VoteDecision::Approve),
            Vote::new("c", VoteDecision::Reject),
        ];
        assert!(VotingStrategy::Quorum.decide(&tally(&votes, 3), 0.66, 0.5));
    }

    #[test]
    fn test_weighted_threshold() {
        let votes = vec![
            Vote::new("a", VoteDecision::Approve).with_weight(2.0),
            Vote::new("b", VoteDecision::Reject).with_weight(1.0),
        ];
        let t = tally(&votes, 2);
        assert!(VotingStrategy::Weighted.decide(&t, 0.66, 0.5));
        assert!(!VotingStrategy::Weighted.decide(&t, 0.7, 0.5));
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!(
            "SUPERMAJORITY".parse::<VotingStrategy>().unwrap(),
            VotingStrategy::Supermajority
        );
        assert!(matches!(
            "plurality".parse::<VotingStrategy>(),
            Err(ConcordError::UnknownStrategy(_))
        ));
    }
}
