//! Scoring strategies.
//!
//! Each strategy is a pure function of its own explicit context struct; no
//! shared loosely-typed signature, no hidden repository lookups. A strategy
//! that cannot apply (golden-set scoring without a golden example) says so
//! with an explicit [`StrategyOutcome::Inapplicable`] variant; the fusion
//! step treats "inapplicable" and "applicable but poor" as distinct inputs,
//! never via error propagation.

pub mod bot;
pub mod golden;
pub mod statistical;
pub mod threshold;

use serde::{Deserialize, Serialize};

use crate::issue::Issue;

pub use bot::{BotContext, BotDetectionStrategy, SessionSample};
pub use golden::GoldenSetStrategy;
pub use statistical::{BaselineSample, StatisticalStrategy, StatsContext};
pub use threshold::{ThresholdContext, ThresholdStrategy};

/// Which scoring strategy to apply, when the caller pins one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    /// Compare against the curated golden example for the task.
    GoldenSet,
    /// Response-time and pattern-repetition automation checks.
    BotDetection,
    /// Comparison against the recent submission distribution.
    Statistical,
    /// Fixed minimum-time and well-formedness checks.
    Threshold,
}

/// A strategy's scored verdict on one submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assessment {
    /// Quality in `[0, 1]`.
    pub quality: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Findings supporting the scores.
    pub issues: Vec<Issue>,
    /// Worker-facing feedback, when the strategy has something to say.
    pub feedback: Option<String>,
}

/// Outcome of running one strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// The strategy scored the submission.
    Applicable(Assessment),
    /// The strategy cannot score this submission; the issue says why.
    /// Fusion excludes it rather than counting it as low quality.
    Inapplicable(Issue),
}

impl StrategyOutcome {
    /// The assessment, if the strategy applied.
    #[must_use]
    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            Self::Applicable(assessment) => Some(assessment),
            Self::Inapplicable(_) => None,
        }
    }

    /// Converts to an assessment, mapping inapplicability to a
    /// zero-quality/zero-confidence verdict carrying the explanatory issue.
    ///
    /// Used only when the caller pinned this strategy explicitly and a
    /// verdict must be produced regardless.
    #[must_use]
    pub fn into_assessment(self) -> Assessment {
        match self {
            Self::Applicable(assessment) => assessment,
            Self::Inapplicable(issue) => Assessment {
                quality: 0.0,
                confidence: 0.0,
                issues: vec![issue],
                feedback: None,
            },
        }
    }
}
