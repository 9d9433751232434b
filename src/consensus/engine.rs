//! Consensus engine: concurrent vote collection and tallying
//!
//! One engine instance runs one voting round. Votes arrive either through
//! the concurrent collection fan-out in `conduct_voting` or out-of-band via
//! `add_vote`; both paths share the recorded-once ledger.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::VotingConfig;
use crate::consensus::strategy::VotingStrategy;
use crate::consensus::vote::{ConsensusDecision, Vote, VoteTally, VotingResult};
use crate::error::{ConcordError, Result};
use crate::governance::{AuditRecord, AuditSink, ConstitutionalGuard};

/// Collects one participant's vote on a proposal.
///
/// Implementations typically make a network call to a remote agent; each
/// call is bounded by the per-participant timeout budget.
#[async_trait]
pub trait VoteCollector: Send + Sync {
    async fn collect_vote(&self, participant_id: &str, proposal: &Value) -> Result<Vote>;
}

/// Recorded-once vote ledger for a round
#[derive(Debug, Default)]
struct VoteLedger {
    votes: Vec<Vote>,
    voted: HashSet<String>,
}

impl VoteLedger {
    /// Append a vote unless the participant has already voted.
    fn try_record(&mut self, vote: Vote) -> bool {
        if self.voted.contains(&vote.participant_id) {
            return false;
        }
        self.voted.insert(vote.participant_id.clone());
        self.votes.push(vote);
        true
    }
}

/// Runs one voting round over a set of eligible participants
pub struct ConsensusEngine {
    config: VotingConfig,
    guard: Arc<ConstitutionalGuard>,
    sink: Arc<dyn AuditSink>,
    voting_id: String,
    ledger: RwLock<VoteLedger>,
}

impl ConsensusEngine {
    pub fn new(
        config: VotingConfig,
        guard: Arc<ConstitutionalGuard>,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            guard,
            sink,
            voting_id: Uuid::new_v4().to_string(),
            ledger: RwLock::new(VoteLedger::default()),
        })
    }

    pub fn voting_id(&self) -> &str {
        &self.voting_id
    }

    pub fn strategy(&self) -> VotingStrategy {
        self.config.strategy
    }

    /// Record a vote out-of-band.
    ///
    /// Returns false (without raising) when the participant is not eligible
    /// or has already voted; the existing tally is unaffected.
    pub async fn add_vote(&self, vote: Vote) -> bool {
        if !self
            .config
            .eligible_participants
            .iter()
            .any(|p| p == &vote.participant_id)
        {
            debug!(
                participant = %vote.participant_id,
                "rejecting vote from ineligible participant"
            );
            return false;
        }
        let vote = self.apply_weight(vote);
        let recorded = self.ledger.write().await.try_record(vote);
        if !recorded {
            debug!("duplicate vote ignored");
        }
        recorded
    }

    /// Collect votes from all eligible participants and decide the round.
    ///
    /// Collection fans out concurrently; each participant gets an equal
    /// share of the total voting budget. A participant whose call errors or
    /// times out contributes no vote. The round itself fails only on the
    /// overall budget elapsing or on a compliance mismatch.
    pub async fn conduct_voting(
        &self,
        proposal: &Value,
        collector: Arc<dyn VoteCollector>,
        compliance_token: &str,
    ) -> Result<VotingResult> {
        self.guard.verify(compliance_token)?;

        let eligible = &self.config.eligible_participants;
        let per_participant =
            Duration::from_secs_f64(self.config.voting_timeout_secs / eligible.len() as f64);
        let overall = Duration::from_secs_f64(self.config.voting_timeout_secs);

        // Skip participants that already voted out-of-band
        let already_voted = self.ledger.read().await.voted.clone();
        let pending: Vec<String> = eligible
            .iter()
            .filter(|p| !already_voted.contains(*p))
            .cloned()
            .collect();

        info!(
            voting_id = %self.voting_id,
            strategy = %self.config.strategy,
            pending = pending.len(),
            budget_secs = self.config.voting_timeout_secs,
            "collecting votes"
        );

        let mut calls = FuturesUnordered::new();
        for participant in pending {
            let collector = Arc::clone(&collector);
            calls.push(async move {
                let outcome =
                    tokio::time::timeout(per_participant, collector.collect_vote(&participant, proposal))
                        .await;
                (participant, outcome)
            });
        }

        let collection = async {
            while let Some((participant, outcome)) = calls.next().await {
                match outcome {
                    Ok(Ok(vote)) => {
                        let vote = self.apply_weight(vote);
                        self.ledger.write().await.try_record(vote);
                    }
                    Ok(Err(e)) => {
                        warn!(%participant, error = %e, "vote collection failed, excluding participant");
                    }
                    Err(_) => {
                        warn!(%participant, "vote collection timed out, excluding participant");
                    }
                }
            }
        };

        if tokio::time::timeout(overall, collection).await.is_err() {
            warn!(voting_id = %self.voting_id, "voting round exceeded overall budget");
            return Err(ConcordError::Timeout {
                operation: "voting_round".to_string(),
                budget_secs: self.config.voting_timeout_secs,
            });
        }

        Ok(self.finalize().await)
    }

    /// Tally recorded votes and build the round's result.
    async fn finalize(&self) -> VotingResult {
        let ledger = self.ledger.read().await;
        let tally = VoteTally::from_votes(&ledger.votes, self.config.eligible_participants.len());

        let approved = self.config.strategy.decide(
            &tally,
            self.config.approval_threshold,
            self.config.quorum_percentage,
        );
        let decision = if approved {
            ConsensusDecision::Approved
        } else {
            ConsensusDecision::Rejected
        };
        // Reported for every strategy, not only quorum-sensitive ones
        let quorum_met = tally.participation() >= self.config.quorum_percentage;

        let result = VotingResult {
            voting_id: self.voting_id.clone(),
            decision,
            strategy: self.config.strategy,
            votes: ledger.votes.clone(),
            approval_rate: self.config.strategy.approval_rate(&tally),
            quorum_met,
            compliance_token: self.guard.token().to_string(),
            details: tally,
        };

        info!(
            voting_id = %result.voting_id,
            decision = %result.decision,
            approval_rate = result.approval_rate,
            quorum_met = result.quorum_met,
            voted = result.details.total_voted,
            eligible = result.details.total_eligible,
            "voting round finalized"
        );

        if let Ok(record) = result.to_record() {
            self.sink.emit(AuditRecord::Voting(record));
        }
        result
    }

    fn apply_weight(&self, mut vote: Vote) -> Vote {
        if let Some(weight) = self.config.participant_weights.get(&vote.participant_id) {
            vote.weight = *weight;
        }
        vote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::vote::VoteDecision;
    use crate::governance::TracingAuditSink;
    use serde_json::json;
    use std::collections::HashMap;

    /// Scripted collector: fixed decision per participant, optional slow set
    struct ScriptedCollector {
        decisions: HashMap<String, VoteDecision>,
        slow: HashSet<String>,
    }

    impl ScriptedCollector {
        fn new(decisions: &[(&str, VoteDecision)]) -> Self {
            Self {
                decisions: decisions
                    .iter()
                    .map(|(id, d)| (id.to_string(), *d))
                    .collect(),
                slow: HashSet::new(),
            }
        }

        fn with_slow(mut self, id: &str) -> Self {
            self.slow.insert(id.to_string());
            self
        }
    }

    #[async_trait]
    impl VoteCollector for ScriptedCollector {
        async fn collect_vote(&self, participant_id: &str, _proposal: &Value) -> Result<Vote> {
            if self.slow.contains(participant_id) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            match self.decisions.get(participant_id) {
                Some(decision) => Ok(Vote::new(participant_id, *decision)),
                None => Err(ConcordError::Internal(format!(
                    "no scripted decision for {participant_id}"
                ))),
            }
        }
    }

    fn engine(eligible: &[&str], strategy: VotingStrategy) -> ConsensusEngine {
        engine_with(eligible, strategy, |_| {})
    }

    fn engine_with(
        eligible: &[&str],
        strategy: VotingStrategy,
        tweak: impl FnOnce(&mut VotingConfig),
    ) -> ConsensusEngine {
        let mut config = VotingConfig {
            eligible_participants: eligible.iter().map(|s| s.to_string()).collect(),
            strategy,
            voting_timeout_secs: 2.0,
            ..Default::default()
        };
        tweak(&mut config);
        ConsensusEngine::new(
            config,
            Arc::new(ConstitutionalGuard::new("tok")),
            Arc::new(TracingAuditSink),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_eligible_set_rejected_at_construction() {
        let result = ConsensusEngine::new(
            VotingConfig::default(),
            Arc::new(ConstitutionalGuard::new("tok")),
            Arc::new(TracingAuditSink),
        );
        assert!(matches!(result, Err(ConcordError::Validation(_))));
    }

    #[tokio::test]
    async fn test_majority_round_approves() {
        let engine = engine(&["a", "b", "c"], VotingStrategy::Majority);
        let collector = Arc::new(ScriptedCollector::new(&[
            ("a", VoteDecision::Approve),
            ("b", VoteDecision::Approve),
            ("c", VoteDecision::Reject),
        ]));

        let result = engine
            .conduct_voting(&json!({"proposal": "deploy"}), collector, "tok")
            .await
            .unwrap();

        assert!(result.approved());
        assert!((result.approval_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!(result.quorum_met);
        assert_eq!(result.details.total_voted, 3);
        assert_eq!(result.compliance_token, "tok");
    }

    #[tokio::test]
    async fn test_compliance_mismatch_rejected_before_collection() {
        let engine = engine(&["a"], VotingStrategy::Majority);
        let collector = Arc::new(ScriptedCollector::new(&[("a", VoteDecision::Approve)]));

        let err = engine
            .conduct_voting(&json!({}), collector, "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ConcordError::ComplianceMismatch));
    }

    #[tokio::test]
    async fn test_slow_participant_excluded_not_abstain() {
        let engine = engine_with(&["a", "b"], VotingStrategy::Majority, |c| {
            c.voting_timeout_secs = 0.4;
        });
        let collector = Arc::new(
            ScriptedCollector::new(&[
                ("a", VoteDecision::Approve),
                ("b", VoteDecision::Approve),
            ])
            .with_slow("b"),
        );

        let result = engine
            .conduct_voting(&json!({}), collector, "tok")
            .await
            .unwrap();

        assert_eq!(result.details.total_voted, 1);
        assert_eq!(result.details.abstentions, 0);
        // Quorum still reported: 1 of 2 voted, exactly the 0.5 default
        assert!(result.quorum_met);
    }

    #[tokio::test]
    async fn test_failing_participant_degrades_round() {
        // "c" has no scripted decision, so its call errors
        let engine = engine(&["a", "b", "c"], VotingStrategy::Majority);
        let collector = Arc::new(ScriptedCollector::new(&[
            ("a", VoteDecision::Approve),
            ("b", VoteDecision::Approve),
        ]));

        let result = engine
            .conduct_voting(&json!({}), collector, "tok")
            .await
            .unwrap();
        assert_eq!(result.details.total_voted, 2);
        assert!(result.approved());
    }

    #[tokio::test]
    async fn test_quorum_strategy_rejects_low_participation() {
        let ids: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
        let engine = engine(&id_refs, VotingStrategy::Quorum);
        // Only 4 of 10 respond, all approving
        let scripted: Vec<(&str, VoteDecision)> = id_refs[..4]
            .iter()
            .map(|id| (*id, VoteDecision::Approve))
            .collect();
        let collector = Arc::new(ScriptedCollector::new(&scripted));

        let result = engine
            .conduct_voting(&json!({}), collector, "tok")
            .await
            .unwrap();
        assert!(!result.approved());
        assert!(!result.quorum_met);
    }

    #[tokio::test]
    async fn test_weighted_strategy_uses_configured_weights() {
        let engine = engine_with(&["a", "b"], VotingStrategy::Weighted, |c| {
            c.participant_weights = HashMap::from([("a".to_string(), 2.0)]);
            c.approval_threshold = 0.66;
        });
        let collector = Arc::new(ScriptedCollector::new(&[
            ("a", VoteDecision::Approve),
            ("b", VoteDecision::Reject),
        ]));

        let result = engine
            .conduct_voting(&json!({}), collector, "tok")
            .await
            .unwrap();
        assert!(result.approved());
        assert!((result.approval_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_add_vote_is_recorded_once() {
        let engine = engine(&["a", "b"], VotingStrategy::Majority);

        assert!(engine.add_vote(Vote::new("a", VoteDecision::Approve)).await);
        assert!(!engine.add_vote(Vote::new("a", VoteDecision::Reject)).await);

        let ledger = engine.ledger.read().await;
        assert_eq!(ledger.votes.len(), 1);
        assert_eq!(ledger.votes[0].decision, VoteDecision::Approve);
    }

    #[tokio::test]
    async fn test_add_vote_rejects_ineligible_participant() {
        let engine = engine(&["a"], VotingStrategy::Majority);
        assert!(
            !engine
                .add_vote(Vote::new("intruder", VoteDecision::Approve))
                .await
        );
    }

    #[tokio::test]
    async fn test_out_of_band_vote_not_collected_again() {
        let engine = engine(&["a", "b"], VotingStrategy::Majority);
        engine
            .add_vote(Vote::new("a", VoteDecision::Approve))
            .await;

        // Collector would flip "a" to reject if consulted
        let collector = Arc::new(ScriptedCollector::new(&[
            ("a", VoteDecision::Reject),
            ("b", VoteDecision::Approve),
        ]));
        let result = engine
            .conduct_voting(&json!({}), collector, "tok")
            .await
            .unwrap();

        assert_eq!(result.details.total_voted, 2);
        assert_eq!(result.details.approvals, 2);
        assert_eq!(result.details.rejections, 0);
    }
}
