use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::consensus::VotingStrategy;
use crate::error::{ConcordError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub voting: VotingConfig,
    #[serde(default)]
    pub auction: AuctionConfig,
    #[serde(default)]
    pub handoff: HandoffDefaults,
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for a consensus voting round
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// Participant IDs eligible to vote in this round
    #[serde(default)]
    pub eligible_participants: Vec<String>,
    /// Decision strategy for the round
    #[serde(default)]
    pub strategy: VotingStrategy,
    /// Total budget for collecting votes, split evenly across participants
    #[serde(default = "default_voting_timeout")]
    pub voting_timeout_secs: f64,
    /// Minimum participation ratio (0-1) for quorum
    #[serde(default = "default_quorum_percentage")]
    pub quorum_percentage: f64,
    /// Weighted-strategy approval threshold (0-1)
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: f64,
    /// Per-participant vote weights; unlisted participants weigh 1.0
    #[serde(default)]
    pub participant_weights: HashMap<String, f64>,
}

fn default_voting_timeout() -> f64 {
    30.0
}

fn default_quorum_percentage() -> f64 {
    0.5
}

fn default_approval_threshold() -> f64 {
    0.66
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            eligible_participants: Vec::new(),
            strategy: VotingStrategy::default(),
            voting_timeout_secs: default_voting_timeout(),
            quorum_percentage: default_quorum_percentage(),
            approval_threshold: default_approval_threshold(),
            participant_weights: HashMap::new(),
        }
    }
}

impl VotingConfig {
    /// Validate the configuration before a round starts.
    pub fn validate(&self) -> Result<()> {
        if self.eligible_participants.is_empty() {
            return Err(ConcordError::Validation(
                "eligible participant set is empty".to_string(),
            ));
        }
        if self.voting_timeout_secs <= 0.0 {
            return Err(ConcordError::Validation(format!(
                "voting_timeout_secs must be positive, got {}",
                self.voting_timeout_secs
            )));
        }
        for (name, value) in [
            ("quorum_percentage", self.quorum_percentage),
            ("approval_threshold", self.approval_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConcordError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the auction market
#[derive(Debug, Clone, Deserialize)]
pub struct AuctionConfig {
    /// Budget for an auction without an explicit deadline; also bounds
    /// `run_auction` bid-collection polling
    #[serde(default = "default_auction_timeout")]
    pub auction_timeout_secs: f64,
    /// Polling interval while waiting for bids in milliseconds
    #[serde(default = "default_auction_poll_interval")]
    pub poll_interval_ms: u64,
    /// Concurrent task capacity assigned to newly registered participants
    #[serde(default = "default_max_concurrent_tasks")]
    pub default_max_concurrent_tasks: u32,
}

fn default_auction_timeout() -> f64 {
    30.0
}

fn default_auction_poll_interval() -> u64 {
    100
}

fn default_max_concurrent_tasks() -> u32 {
    3
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            auction_timeout_secs: default_auction_timeout(),
            poll_interval_ms: default_auction_poll_interval(),
            default_max_concurrent_tasks: default_max_concurrent_tasks(),
        }
    }
}

/// Default timeout budget applied to handoffs built from file config
#[derive(Debug, Clone, Deserialize)]
pub struct HandoffDefaults {
    /// Overall handoff budget in seconds; each bounded stage gets a quarter
    #[serde(default = "default_handoff_timeout")]
    pub handoff_timeout_secs: u64,
}

fn default_handoff_timeout() -> u64 {
    60
}

impl Default for HandoffDefaults {
    fn default() -> Self {
        Self {
            handoff_timeout_secs: default_handoff_timeout(),
        }
    }
}

/// Governance-layer collaborator settings
#[derive(Debug, Clone, Deserialize)]
pub struct GovernanceConfig {
    /// Fixed compliance token shared across all coordination calls
    pub compliance_token: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("voting.voting_timeout_secs", default_voting_timeout())?
            .set_default("auction.auction_timeout_secs", default_auction_timeout())?
            .set_default("handoff.handoff_timeout_secs", default_handoff_timeout() as i64)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("CONCORD_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (CONCORD_VOTING__STRATEGY, etc.)
            .add_source(
                Environment::with_prefix("CONCORD")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
