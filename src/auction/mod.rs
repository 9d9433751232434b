//! Auction-based task assignment
//!
//! The market registers participants with capabilities and cost, runs timed
//! auctions for tasks, admits bids under the auction rules, and selects a
//! winner by composite score (lower is better).

pub mod auction;
pub mod bid;
pub mod market;

pub use auction::{AuctionStatus, AuctionStatusView, BidOutcome, RejectReason, TaskAuction};
pub use bid::Bid;
pub use market::{AuctionMarket, RegisteredParticipant};
