//! Constitutional compliance check
//!
//! Every coordination operation carries a compliance token issued by the
//! governance layer. The guard compares it byte-for-byte against the
//! configured constant and rejects mismatches before any work begins.

use tracing::warn;

use crate::error::{ConcordError, Result};

/// Validates the fixed compliance token accompanying every operation
#[derive(Debug, Clone)]
pub struct ConstitutionalGuard {
    token: String,
}

impl ConstitutionalGuard {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The canonical token, embedded into result records
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Check a caller-supplied token against the configured constant.
    pub fn verify(&self, token: &str) -> Result<()> {
        if token.as_bytes() == self.token.as_bytes() {
            Ok(())
        } else {
            warn!("compliance token mismatch, rejecting operation");
            Err(ConcordError::ComplianceMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_token_accepted() {
        let guard = ConstitutionalGuard::new("constitution-v1");
        assert!(guard.verify("constitution-v1").is_ok());
    }

    #[test]
    fn test_mismatched_token_rejected() {
        let guard = ConstitutionalGuard::new("constitution-v1");
        let err = guard.verify("constitution-v2").unwrap_err();
        assert!(matches!(err, ConcordError::ComplianceMismatch));
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let guard = ConstitutionalGuard::new("constitution-v1");
        assert!(guard.verify("constitution-v1-extra").is_err());
        assert!(guard.verify("constitution").is_err());
    }
}
