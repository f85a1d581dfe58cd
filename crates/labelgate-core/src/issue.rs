//! Structured validation issues.
//!
//! Every strategy and the comparator report findings as issues rather than
//! errors: a wrong-shape answer or an implausibly fast submission is a valid,
//! low-quality outcome, not an exceptional one. Issues from all comparisons
//! performed for one submission are concatenated onto the final validation.

use serde::{Deserialize, Serialize};

/// Machine-readable tag for a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum IssueKind {
    /// Expected and actual response shapes are incompatible.
    TypeMismatch,
    /// A record response is missing expected keys.
    MissingKeys,
    /// A structural comparison matched only partially.
    PartialMatch,
    /// A value differed from the expected one.
    ValueMismatch,
    /// Expected sequence items absent from the candidate.
    MissingItems,
    /// Candidate sequence items absent from the expected answer.
    UnexpectedItems,
    /// The response does not match the golden example within tolerance.
    GoldenSetMismatch,
    /// No golden example exists for the task; the strategy is inapplicable.
    NoGoldenExample,
    /// The submission arrived implausibly fast.
    SuspiciouslyFastResponse,
    /// The session keeps repeating the same response or cadence.
    RepetitivePattern,
    /// The response content looks like random clicking or keyboard mashing.
    RandomInput,
    /// Response time is a statistical outlier against the baseline.
    UnusualResponseTime,
    /// The response value has not been observed in the baseline.
    UnusualResponse,
    /// Response length is a statistical outlier against the baseline.
    UnusualResponseLength,
    /// The submission is below the minimum expected time for its task type.
    InsufficientTime,
    /// The response shape is invalid for the declared task type.
    InvalidFormat,
    /// The response content is too short to be meaningful.
    InsufficientContent,
    /// The response content is excessively repetitive.
    RepetitiveContent,
    /// The response text looks like gibberish.
    LowQualityText,
}

/// A single finding attached to a validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Machine-readable tag.
    pub kind: IssueKind,

    /// Human-readable description.
    pub message: String,

    /// How much of the quality score this finding cost, when meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_impact: Option<f64>,

    /// Z-score behind a statistical finding, when meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
}

impl Issue {
    /// Creates an issue with no numeric detail.
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            score_impact: None,
            z_score: None,
        }
    }

    /// Attaches the quality-score impact of this finding.
    #[must_use]
    pub const fn with_score_impact(mut self, impact: f64) -> Self {
        self.score_impact = Some(impact);
        self
    }

    /// Attaches the z-score behind this finding.
    #[must_use]
    pub const fn with_z_score(mut self, z_score: f64) -> Self {
        self.z_score = Some(z_score);
        self
    }
}
