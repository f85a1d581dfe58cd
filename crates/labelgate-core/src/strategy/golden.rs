//! Golden-set comparison strategy.
//!
//! When a curated expected answer exists for the task, comparing against it
//! is the highest-trust signal the engine has: confidence is pinned at 1.0
//! and quality comes straight from the structural comparator. Without a
//! golden example the strategy is inapplicable rather than scored low.

use crate::compare;
use crate::golden::GoldenExample;
use crate::issue::{Issue, IssueKind};
use crate::response::Response;
use crate::strategy::{Assessment, StrategyOutcome};

/// Quality at or above which the worker gets a success message.
const SUCCESS_FEEDBACK_THRESHOLD: f64 = 0.95;

/// Quality at or above which a hint (rather than a mismatch message) is
/// offered, when the golden example carries hints.
const HINT_FEEDBACK_THRESHOLD: f64 = 0.5;

/// Golden-set comparison strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoldenSetStrategy;

impl GoldenSetStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scores a response against the task's golden example, if one exists.
    #[must_use]
    pub fn evaluate(
        &self,
        golden: Option<&GoldenExample>,
        response: &Response,
    ) -> StrategyOutcome {
        let Some(golden) = golden else {
            return StrategyOutcome::Inapplicable(Issue::new(
                IssueKind::NoGoldenExample,
                "no golden example exists for this task",
            ));
        };

        let comparison = compare::compare(&golden.expected_response, response);
        let quality = comparison.score;
        let mut issues = comparison.issues;

        if quality < 1.0 - golden.allowed_variation {
            issues.push(
                Issue::new(
                    IssueKind::GoldenSetMismatch,
                    "response does not match the expected answer within tolerance",
                )
                .with_score_impact(1.0 - quality),
            );
        }

        let feedback = Some(feedback_for(quality, golden, &issues));

        StrategyOutcome::Applicable(Assessment {
            quality,
            confidence: 1.0,
            issues,
            feedback,
        })
    }
}

/// Worker-facing feedback ladder: success message, then the first curated
/// hint, then a message tailored to the dominant issue.
fn feedback_for(quality: f64, golden: &GoldenExample, issues: &[Issue]) -> String {
    if quality >= SUCCESS_FEEDBACK_THRESHOLD {
        return "Response matches the expected answer.".to_owned();
    }
    if quality >= HINT_FEEDBACK_THRESHOLD {
        if let Some(hint) = golden.hints.first() {
            return hint.clone();
        }
    }
    dominant_mismatch_message(issues)
}

/// Mismatch message priority: type error > missing keys > partial match >
/// value mismatch.
fn dominant_mismatch_message(issues: &[Issue]) -> String {
    let has = |kind: IssueKind| issues.iter().any(|issue| issue.kind == kind);
    if has(IssueKind::TypeMismatch) {
        "Your answer has the wrong format for this task.".to_owned()
    } else if has(IssueKind::MissingKeys) {
        "Your answer is missing required fields.".to_owned()
    } else if has(IssueKind::PartialMatch) {
        "Your answer only partially matches the expected one.".to_owned()
    } else {
        "Response does not match the expected answer.".to_owned()
    }
}
