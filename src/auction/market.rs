//! Auction market: participant registry, timers, and finalization
//!
//! Shared state (participant table, active and completed auction maps) is
//! guarded by `RwLock`s; bid admission runs under the active-map write lock
//! so concurrent submitters cannot race past the open/deadline check.
//!
//! Lock order everywhere: active, then completed, then participants.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auction::auction::{AuctionStatusView, BidOutcome, RejectReason, TaskAuction};
use crate::auction::bid::Bid;
use crate::config::AuctionConfig;
use crate::error::{ConcordError, Result};
use crate::governance::{AuditRecord, AuditSink, ConstitutionalGuard};

/// A participant registered with the market. Owned by the market;
/// `active_task_count` is incremented on award and released on completion.
#[derive(Debug, Clone)]
pub struct RegisteredParticipant {
    pub id: String,
    pub capabilities: Vec<String>,
    pub base_cost: f64,
    pub active_task_count: u32,
    pub max_concurrent_tasks: u32,
}

impl RegisteredParticipant {
    /// Remaining concurrent-task headroom, clamped to [0, 1]
    pub fn availability(&self) -> f64 {
        if self.max_concurrent_tasks == 0 {
            return 0.0;
        }
        (1.0 - self.active_task_count as f64 / self.max_concurrent_tasks as f64).clamp(0.0, 1.0)
    }

    /// Fraction of the required capabilities this participant covers
    pub fn capability_match(&self, required: &[String]) -> f64 {
        if required.is_empty() {
            return 1.0;
        }
        let matched = required
            .iter()
            .filter(|cap| self.capabilities.iter().any(|c| &c == cap))
            .count();
        matched as f64 / required.len() as f64
    }
}

/// Registers participants and runs timed auctions for tasks
pub struct AuctionMarket {
    config: AuctionConfig,
    guard: Arc<ConstitutionalGuard>,
    sink: Arc<dyn AuditSink>,
    participants: RwLock<HashMap<String, RegisteredParticipant>>,
    active: RwLock<HashMap<String, TaskAuction>>,
    completed: RwLock<HashMap<String, TaskAuction>>,
}

impl AuctionMarket {
    pub fn new(
        config: AuctionConfig,
        guard: Arc<ConstitutionalGuard>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            guard,
            sink,
            participants: RwLock::new(HashMap::new()),
            active: RwLock::new(HashMap::new()),
            completed: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent upsert. Re-registration refreshes capabilities and cost
    /// but preserves the active task count, so awarded work is not forgotten.
    pub async fn register(
        &self,
        id: impl Into<String>,
        capabilities: Vec<String>,
        base_cost: f64,
    ) {
        let id = id.into();
        let mut participants = self.participants.write().await;
        let active_task_count = participants
            .get(&id)
            .map(|p| p.active_task_count)
            .unwrap_or(0);
        debug!(participant = %id, capabilities = capabilities.len(), "participant registered");
        participants.insert(
            id.clone(),
            RegisteredParticipant {
                id,
                capabilities,
                base_cost,
                active_task_count,
                max_concurrent_tasks: self.config.default_max_concurrent_tasks,
            },
        );
    }

    /// Create an `open` auction for a task.
    ///
    /// `deadline_in` becomes `now + duration`. Without an explicit deadline a
    /// background timer closes and finalizes the auction after the configured
    /// auction timeout. The timer holds a weak market reference so a dropped
    /// market leaks no work.
    pub async fn create_auction(
        self: &Arc<Self>,
        task_id: impl Into<String>,
        description: impl Into<String>,
        required_capabilities: Vec<String>,
        deadline_in: Option<Duration>,
        max_bid_amount: Option<f64>,
        compliance_token: &str,
    ) -> Result<()> {
        self.guard.verify(compliance_token)?;
        let task_id = task_id.into();

        // Deadline is simply now + duration
        let deadline = deadline_in.map(|d| {
            Utc::now() + chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
        });

        {
            let mut active = self.active.write().await;
            let completed = self.completed.read().await;
            if active.contains_key(&task_id) || completed.contains_key(&task_id) {
                return Err(ConcordError::Validation(format!(
                    "auction already exists for task {task_id}"
                )));
            }
            active.insert(
                task_id.clone(),
                TaskAuction::new(
                    task_id.clone(),
                    description,
                    required_capabilities,
                    deadline,
                    max_bid_amount,
                ),
            );
        }
        info!(task_id = %task_id, ?deadline, "auction opened");

        if deadline.is_none() {
            let market: Weak<Self> = Arc::downgrade(self);
            let timeout = Duration::from_secs_f64(self.config.auction_timeout_secs);
            let timer_task = task_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(market) = market.upgrade() {
                    debug!(task_id = %timer_task, "auto-close timer fired");
                    if let Err(e) = market.finalize_auction(&timer_task).await {
                        warn!(task_id = %timer_task, error = %e, "auto-close failed");
                    }
                }
            });
        }
        Ok(())
    }

    /// Submit a bid on behalf of a registered participant.
    ///
    /// Ordinary rejections (not open, deadline, ceiling, capabilities) come
    /// back as `BidOutcome::Rejected`; only unknown IDs are errors.
    pub async fn submit_bid(
        &self,
        participant_id: &str,
        task_id: &str,
        bid_amount: f64,
        estimated_completion_secs: f64,
    ) -> Result<BidOutcome> {
        let participant = {
            let participants = self.participants.read().await;
            participants
                .get(participant_id)
                .cloned()
                .ok_or_else(|| ConcordError::UnknownParticipant(participant_id.to_string()))?
        };

        // Admission check and bids-list update are atomic under this lock
        let mut active = self.active.write().await;
        let auction = match active.get_mut(task_id) {
            Some(auction) => auction,
            None => {
                // A finalized auction is "not open", not unknown
                let completed = self.completed.read().await;
                return if completed.contains_key(task_id) {
                    Ok(BidOutcome::Rejected(RejectReason::AuctionNotOpen))
                } else {
                    Err(ConcordError::UnknownAuction(task_id.to_string()))
                };
            }
        };

        let bid = Bid {
            participant_id: participant.id.clone(),
            task_id: task_id.to_string(),
            bid_amount,
            capability_score: participant.capability_match(&auction.required_capabilities),
            availability_score: participant.availability(),
            estimated_completion_secs,
            timestamp: Utc::now(),
            capabilities: participant.capabilities.clone(),
        };
        let outcome = auction.admit_bid(bid);
        if let BidOutcome::Rejected(reason) = outcome {
            debug!(%participant_id, %task_id, %reason, "bid rejected");
        }
        Ok(outcome)
    }

    /// Run an auction to completion.
    ///
    /// With `wait_for_bids`, polls until `min_bids` bids are present or the
    /// auction timeout elapses, whichever comes first, then finalizes.
    /// Finalizing an already-finalized auction returns the cached winner.
    pub async fn run_auction(
        &self,
        task_id: &str,
        wait_for_bids: bool,
        min_bids: usize,
    ) -> Result<Option<Bid>> {
        if wait_for_bids {
            let poll = Duration::from_millis(self.config.poll_interval_ms);
            let deadline =
                tokio::time::Instant::now() + Duration::from_secs_f64(self.config.auction_timeout_secs);
            loop {
                {
                    let active = self.active.read().await;
                    match active.get(task_id) {
                        Some(auction) if auction.bids.len() < min_bids => {}
                        // Enough bids, or already finalized elsewhere
                        _ => break,
                    }
                }
                if tokio::time::Instant::now() >= deadline {
                    debug!(%task_id, "bid collection window elapsed");
                    break;
                }
                tokio::time::sleep(poll).await;
            }
        }
        self.finalize_auction(task_id).await
    }

    /// Move an auction from active to completed exactly once and award it.
    pub async fn finalize_auction(&self, task_id: &str) -> Result<Option<Bid>> {
        let (auction, winner) = {
            let mut active = self.active.write().await;
            let mut completed = self.completed.write().await;

            if let Some(done) = completed.get(task_id) {
                return Ok(done.winning_bid.clone());
            }
            let mut auction = active
                .remove(task_id)
                .ok_or_else(|| ConcordError::UnknownAuction(task_id.to_string()))?;

            let winner = auction.close();
            completed.insert(task_id.to_string(), auction.clone());
            (auction, winner)
        };

        if let Some(ref winner) = winner {
            let mut participants = self.participants.write().await;
            if let Some(participant) = participants.get_mut(&winner.participant_id) {
                participant.active_task_count += 1;
            }
            info!(
                %task_id,
                winner = %winner.participant_id,
                score = winner.composite_score(),
                bids = auction.bids.len(),
                "auction awarded"
            );
        } else {
            info!(%task_id, "auction closed with no winner");
        }

        if let Ok(record) = serde_json::to_value(auction.status_view()) {
            self.sink.emit(AuditRecord::Auction(record));
        }
        Ok(winner)
    }

    /// Release one unit of a participant's task capacity.
    pub async fn complete_task(&self, participant_id: &str) -> Result<()> {
        let mut participants = self.participants.write().await;
        let participant = participants
            .get_mut(participant_id)
            .ok_or_else(|| ConcordError::UnknownParticipant(participant_id.to_string()))?;
        participant.active_task_count = participant.active_task_count.saturating_sub(1);
        Ok(())
    }

    /// Status projection; consults active and completed collections.
    pub async fn auction_status(&self, task_id: &str) -> Option<AuctionStatusView> {
        if let Some(auction) = self.active.read().await.get(task_id) {
            return Some(auction.status_view());
        }
        self.completed
            .read()
            .await
            .get(task_id)
            .map(|a| a.status_view())
    }

    pub async fn participant(&self, id: &str) -> Option<RegisteredParticipant> {
        self.participants.read().await.get(id).cloned()
    }
}
