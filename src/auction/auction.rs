//! Task auction lifecycle and admission rules
//!
//! An auction is created `open` and transitions to `closed` or `awarded`
//! exactly once, via explicit close, deadline expiry, or the market's
//! auto-close timer. No bids are accepted once it is not open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auction::bid::Bid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Open,
    Closed,
    Awarded,
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuctionStatus::Open => write!(f, "open"),
            AuctionStatus::Closed => write!(f, "closed"),
            AuctionStatus::Awarded => write!(f, "awarded"),
        }
    }
}

/// Why a bid was turned away. Ordinary rejections, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    AuctionNotOpen,
    DeadlinePassed,
    AboveCeiling,
    MissingCapabilities,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::AuctionNotOpen => write!(f, "auction not open"),
            RejectReason::DeadlinePassed => write!(f, "deadline passed"),
            RejectReason::AboveCeiling => write!(f, "bid above ceiling"),
            RejectReason::MissingCapabilities => write!(f, "missing required capabilities"),
        }
    }
}

/// Admission outcome for a submitted bid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl BidOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BidOutcome::Accepted)
    }
}

/// Flat status projection for transport and audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionStatusView {
    pub task_id: String,
    pub status: AuctionStatus,
    pub bid_count: usize,
    pub winning_bid: Option<Bid>,
}

/// A timed auction for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAuction {
    pub task_id: String,
    pub description: String,
    pub required_capabilities: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub max_bid_amount: Option<f64>,
    pub bids: Vec<Bid>,
    pub status: AuctionStatus,
    pub winning_bid: Option<Bid>,
    pub created_at: DateTime<Utc>,
}

impl TaskAuction {
    pub fn new(
        task_id: impl Into<String>,
        description: impl Into<String>,
        required_capabilities: Vec<String>,
        deadline: Option<DateTime<Utc>>,
        max_bid_amount: Option<f64>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            required_capabilities,
            deadline,
            max_bid_amount,
            bids: Vec::new(),
            status: AuctionStatus::Open,
            winning_bid: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AuctionStatus::Open
    }

    /// Check admission rules and append the bid when they all pass.
    ///
    /// Callers must hold the market's auction lock so the open/deadline
    /// check and the bids-list update are atomic relative to concurrent
    /// submitters.
    pub fn admit_bid(&mut self, bid: Bid) -> BidOutcome {
        if !self.is_open() {
            return BidOutcome::Rejected(RejectReason::AuctionNotOpen);
        }
        if let Some(deadline) = self.deadline {
            if Utc::now() > deadline {
                return BidOutcome::Rejected(RejectReason::DeadlinePassed);
            }
        }
        if let Some(ceiling) = self.max_bid_amount {
            if bid.bid_amount > ceiling {
                return BidOutcome::Rejected(RejectReason::AboveCeiling);
            }
        }
        let covered = self
            .required_capabilities
            .iter()
            .all(|cap| bid.capabilities.iter().any(|c| c == cap));
        if !covered {
            return BidOutcome::Rejected(RejectReason::MissingCapabilities);
        }

        debug!(
            task_id = %self.task_id,
            participant = %bid.participant_id,
            amount = bid.bid_amount,
            "bid admitted"
        );
        self.bids.push(bid);
        BidOutcome::Accepted
    }

    /// Close the auction and pick the winner, exactly once.
    ///
    /// Stable sort on composite score keeps insertion order among ties, so
    /// the earliest of two equally scored bids wins. Calling `close` on an
    /// already-finalized auction is a no-op returning the cached winner.
    pub fn close(&mut self) -> Option<Bid> {
        if !self.is_open() {
            return self.winning_bid.clone();
        }

        let mut ranked: Vec<&Bid> = self.bids.iter().collect();
        ranked.sort_by(|a, b| a.composite_score().total_cmp(&b.composite_score()));
        self.winning_bid = ranked.first().map(|b| (*b).clone());

        self.status = if self.winning_bid.is_some() {
            AuctionStatus::Awarded
        } else {
            AuctionStatus::Closed
        };
        self.winning_bid.clone()
    }

    pub fn status_view(&self) -> AuctionStatusView {
        AuctionStatusView {
            task_id: self.task_id.clone(),
            status: self.status,
            bid_count: self.bids.len(),
            winning_bid: self.winning_bid.clone(),
        }
    }
}
