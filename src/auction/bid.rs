//! Bid value type and composite scoring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bid on a task auction. Immutable once admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub participant_id: String,
    pub task_id: String,
    /// Cost estimate; lower is better
    pub bid_amount: f64,
    /// Fraction of the auction's required capabilities the bidder covers (0-1)
    pub capability_score: f64,
    /// Remaining concurrent-task headroom of the bidder (0-1)
    pub availability_score: f64,
    pub estimated_completion_secs: f64,
    pub timestamp: DateTime<Utc>,
    /// Bidder's declared capability list at submission time
    pub capabilities: Vec<String>,
}

impl Bid {
    /// Cost-adjusted ranking score; lower wins.
    ///
    /// 0.5·bid_amount + 0.3·(1−capability) + 0.2·(1−availability)
    pub fn composite_score(&self) -> f64 {
        0.5 * self.bid_amount
            + 0.3 * (1.0 - self.capability_score)
            + 0.2 * (1.0 - self.availability_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(amount: f64, capability: f64, availability: f64) -> Bid {
        Bid {
            participant_id: "agent-1".to_string(),
            task_id: "task-1".to_string(),
            bid_amount: amount,
            capability_score: capability,
            availability_score: availability,
            estimated_completion_secs: 10.0,
            timestamp: Utc::now(),
            capabilities: vec![],
        }
    }

    #[test]
    fn test_composite_score_weights() {
        let b = bid(1.0, 0.5, 0.5);
        // 0.5*1.0 + 0.3*0.5 + 0.2*0.5 = 0.75
        assert!((b.composite_score() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_fit_scores_only_cost() {
        let b = bid(0.4, 1.0, 1.0);
        assert!((b.composite_score() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_lower_cost_beats_higher_cost_at_equal_fit() {
        let cheap = bid(0.5, 0.8, 0.8);
        let pricey = bid(1.5, 0.8, 0.8);
        assert!(cheap.composite_score() < pricey.composite_score());
    }
}
