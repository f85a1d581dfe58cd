//! Engine configuration.
//!
//! The configuration is injected into the engine at construction time and is
//! immutable thereafter; strategies never reach into global state for
//! thresholds. Construction is fail-closed: a threshold ordering violation or
//! an out-of-range ratio would make the status state machine nondeterministic,
//! so it is rejected here rather than tolerated at request time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by configuration validation.
///
/// These are the only hard failures the engine surfaces; they occur at
/// deployment/construction time, never per request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The high-confidence threshold does not strictly exceed the medium one.
    #[error(
        "high confidence threshold ({high}) must be strictly greater than medium ({medium})"
    )]
    ThresholdOrdering {
        /// Configured high-confidence threshold.
        high: f64,
        /// Configured medium-confidence threshold.
        medium: f64,
    },

    /// A ratio-valued field is outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    RatioOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The minimum consensus validator count is zero.
    #[error("minimum_consensus_validators must be at least 1")]
    ZeroValidators,
}

/// Immutable engine configuration.
///
/// Defaults match the production settings of the original deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaConfig {
    /// Confidence at or above which the engine makes a definitive
    /// validated/rejected judgment.
    pub high_confidence_threshold: f64,

    /// Confidence at or above which a result is considered informative enough
    /// to distinguish "might need review" from "definitely needs review".
    /// Both bands currently route to review; the boundary is kept because the
    /// status table is specified against it.
    pub medium_confidence_threshold: f64,

    /// Number of independent validations a consensus group waits for.
    pub minimum_consensus_validators: u32,

    /// Pairwise agreement level required to resolve a consensus group.
    pub consensus_required_agreement: f64,

    /// Fraction of tasks served as golden-set checks. Consumed by the task
    /// distribution layer; carried here so one config object travels the
    /// whole QA surface.
    pub golden_set_percentage: f64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: 0.85,
            medium_confidence_threshold: 0.60,
            minimum_consensus_validators: 3,
            consensus_required_agreement: 0.75,
            golden_set_percentage: 0.10,
        }
    }
}

impl QaConfig {
    /// Creates a configuration after validating every invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the threshold ordering is violated, any
    /// ratio falls outside `[0, 1]`, or the validator count is zero.
    pub fn new(
        high_confidence_threshold: f64,
        medium_confidence_threshold: f64,
        minimum_consensus_validators: u32,
        consensus_required_agreement: f64,
        golden_set_percentage: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            high_confidence_threshold,
            medium_confidence_threshold,
            minimum_consensus_validators,
            consensus_required_agreement,
            golden_set_percentage,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks every invariant on an existing configuration value.
    ///
    /// Useful when a configuration was deserialized rather than built through
    /// [`QaConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            ("high_confidence_threshold", self.high_confidence_threshold),
            (
                "medium_confidence_threshold",
                self.medium_confidence_threshold,
            ),
            (
                "consensus_required_agreement",
                self.consensus_required_agreement,
            ),
            ("golden_set_percentage", self.golden_set_percentage),
        ];
        for (field, value) in ratios {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ConfigError::RatioOutOfRange { field, value });
            }
        }
        if self.high_confidence_threshold <= self.medium_confidence_threshold {
            return Err(ConfigError::ThresholdOrdering {
                high: self.high_confidence_threshold,
                medium: self.medium_confidence_threshold,
            });
        }
        if self.minimum_consensus_validators == 0 {
            return Err(ConfigError::ZeroValidators);
        }
        Ok(())
    }
}
