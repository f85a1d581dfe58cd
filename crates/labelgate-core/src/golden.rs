//! Golden examples: known-answer tasks seeded into the stream.
//!
//! A golden example pairs a task with its expected response and a tolerance.
//! Besides backing the golden-set scoring strategy, this module carries the
//! lifecycle around the examples themselves:
//!
//! - performance analytics per example (evaluation count, average quality,
//!   pass rate), accumulated out of band and never fed back into scoring;
//! - candidate discovery, which surfaces tasks whose observed responses
//!   agree strongly enough to seed a new example;
//! - promotion of a finished high-quality validation into an example.
//!
//! Candidate agreement here is majority-vote (most frequent canonical
//! response over total observations), a deliberately different statistic
//! from the pairwise agreement used by consensus groups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::response::Response;

/// Quality a validation must reach before it can seed a golden example.
pub const PROMOTION_QUALITY_FLOOR: f64 = 0.9;

/// Errors raised by golden-example construction and promotion.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum GoldenSetError {
    /// The tolerance must be a ratio.
    #[error("allowed variation {value} is outside [0, 1]")]
    VariationOutOfRange {
        /// The rejected value.
        value: f64,
    },

    /// The source validation's quality is below the promotion floor.
    #[error("validation quality {quality} is below the promotion floor {floor}")]
    QualityTooLow {
        /// Quality of the source validation.
        quality: f64,
        /// The required floor.
        floor: f64,
    },
}

/// A task with a known expected answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenExample {
    /// Task this example answers.
    pub task_id: String,
    /// The expected response.
    pub expected_response: Response,
    /// Tolerated similarity shortfall in `[0, 1]`. A candidate passes when
    /// its quality is at least `1 - allowed_variation`.
    pub allowed_variation: f64,
    /// Ordered hints surfaced as feedback for near-miss answers.
    pub hints: Vec<String>,
    /// Free-form grouping label.
    pub category: String,
}

impl GoldenExample {
    /// Creates an example, rejecting a tolerance outside `[0, 1]`.
    pub fn new(
        task_id: impl Into<String>,
        expected_response: Response,
        allowed_variation: f64,
        hints: Vec<String>,
        category: impl Into<String>,
    ) -> Result<Self, GoldenSetError> {
        if !(0.0..=1.0).contains(&allowed_variation) || allowed_variation.is_nan() {
            return Err(GoldenSetError::VariationOutOfRange {
                value: allowed_variation,
            });
        }
        Ok(Self {
            task_id: task_id.into(),
            expected_response,
            allowed_variation,
            hints,
            category: category.into(),
        })
    }

    /// Promotes a finished validation into an example for its task.
    ///
    /// Only high-quality validations qualify; anything below
    /// [`PROMOTION_QUALITY_FLOOR`] is refused.
    pub fn from_validation(
        task_id: impl Into<String>,
        response: Response,
        quality: f64,
        allowed_variation: f64,
        category: impl Into<String>,
    ) -> Result<Self, GoldenSetError> {
        if quality < PROMOTION_QUALITY_FLOOR {
            return Err(GoldenSetError::QualityTooLow {
                quality,
                floor: PROMOTION_QUALITY_FLOOR,
            });
        }
        Self::new(task_id, response, allowed_variation, Vec::new(), category)
    }

    /// Whether a scored evaluation passes this example's tolerance.
    #[must_use]
    pub fn passes(&self, quality: f64) -> bool {
        quality >= 1.0 - self.allowed_variation
    }
}

/// Running evaluation statistics for one golden example.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GoldenPerformance {
    /// Number of recorded evaluations.
    pub evaluations: u64,
    /// Sum of recorded quality scores.
    total_quality: f64,
    /// Evaluations whose quality cleared the example's tolerance.
    passes: u64,
}

impl GoldenPerformance {
    /// Records one evaluation against the example's tolerance.
    pub fn record(&mut self, quality: f64, allowed_variation: f64) {
        self.evaluations += 1;
        self.total_quality += quality;
        if quality >= 1.0 - allowed_variation {
            self.passes += 1;
        }
    }

    /// Mean quality over all recorded evaluations, 0.0 when empty.
    #[must_use]
    pub fn average_quality(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.total_quality / self.evaluations as f64
        }
    }

    /// Fraction of evaluations that passed, 0.0 when empty.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.passes as f64 / self.evaluations as f64
        }
    }
}

/// One observed response for candidate discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedValidation {
    /// Task the response answered.
    pub task_id: String,
    /// The submitted response.
    pub response: Response,
}

/// A task whose observed responses agree strongly enough to seed an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenCandidate {
    /// The candidate task.
    pub task_id: String,
    /// The majority response among observations.
    pub majority_response: Response,
    /// Majority-vote agreement: most frequent canonical response count over
    /// total observations for the task.
    pub agreement: f64,
    /// Total observations for the task.
    pub validations: usize,
}

/// Surfaces tasks whose observed responses converge on one answer.
///
/// Groups observations by task, takes the most frequent canonical response
/// per task, and keeps tasks with at least `min_validations` observations
/// and majority agreement of at least `min_agreement`. Results are sorted
/// by agreement, strongest first; ties break on task id so the ordering is
/// deterministic.
#[must_use]
pub fn find_candidates(
    observations: &[ObservedValidation],
    min_agreement: f64,
    min_validations: usize,
) -> Vec<GoldenCandidate> {
    let mut by_task: HashMap<&str, Vec<&Response>> = HashMap::new();
    for observation in observations {
        by_task
            .entry(observation.task_id.as_str())
            .or_default()
            .push(&observation.response);
    }

    let mut candidates: Vec<GoldenCandidate> = by_task
        .into_iter()
        .filter_map(|(task_id, responses)| {
            let total = responses.len();
            if total < min_validations {
                return None;
            }
            let mut counts: HashMap<String, (usize, &Response)> = HashMap::new();
            for response in responses {
                counts
                    .entry(response.canonical_key())
                    .or_insert((0, response))
                    .0 += 1;
            }
            let (count, majority) = counts
                .into_iter()
                .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| b.0.cmp(&a.0)))
                .map(|(_, entry)| entry)?;
            let agreement = count as f64 / total as f64;
            (agreement >= min_agreement).then(|| GoldenCandidate {
                task_id: task_id.to_owned(),
                majority_response: majority.clone(),
                agreement,
                validations: total,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.agreement
            .partial_cmp(&a.agreement)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(task_id: &str, text: &str) -> ObservedValidation {
        ObservedValidation {
            task_id: task_id.to_owned(),
            response: Response::text(text),
        }
    }

    // =========================================================================
    // Construction and promotion
    // =========================================================================

    #[test]
    fn construction_rejects_out_of_range_variation() {
        let err = GoldenExample::new("t1", Response::text("dog"), 1.5, Vec::new(), "animals")
            .unwrap_err();
        assert_eq!(err, GoldenSetError::VariationOutOfRange { value: 1.5 });
        assert!(
            GoldenExample::new("t1", Response::text("dog"), -0.1, Vec::new(), "animals").is_err()
        );
        assert!(GoldenExample::new("t1", Response::text("dog"), 0.0, Vec::new(), "animals").is_ok());
        assert!(GoldenExample::new("t1", Response::text("dog"), 1.0, Vec::new(), "animals").is_ok());
    }

    #[test]
    fn promotion_requires_high_quality() {
        let err =
            GoldenExample::from_validation("t1", Response::text("dog"), 0.85, 0.1, "animals")
                .unwrap_err();
        assert_eq!(
            err,
            GoldenSetError::QualityTooLow {
                quality: 0.85,
                floor: PROMOTION_QUALITY_FLOOR,
            }
        );

        let example =
            GoldenExample::from_validation("t1", Response::text("dog"), 0.95, 0.1, "animals")
                .unwrap();
        assert_eq!(example.expected_response, Response::text("dog"));
        assert!(example.hints.is_empty());
    }

    #[test]
    fn pass_boundary_is_one_minus_variation() {
        let example =
            GoldenExample::new("t1", Response::text("dog"), 0.1, Vec::new(), "animals").unwrap();
        assert!(example.passes(0.9));
        assert!(!example.passes(0.89));
    }

    // =========================================================================
    // Performance analytics
    // =========================================================================

    #[test]
    fn performance_accumulates_average_and_pass_rate() {
        let mut perf = GoldenPerformance::default();
        assert_eq!(perf.average_quality(), 0.0);
        assert_eq!(perf.pass_rate(), 0.0);

        perf.record(1.0, 0.1);
        perf.record(0.8, 0.1);
        perf.record(0.95, 0.1);
        assert_eq!(perf.evaluations, 3);
        assert!((perf.average_quality() - (1.0 + 0.8 + 0.95) / 3.0).abs() < 1e-9);
        // 1.0 and 0.95 clear the 0.9 floor; 0.8 does not.
        assert!((perf.pass_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    // =========================================================================
    // Candidate discovery
    // =========================================================================

    #[test]
    fn discovery_keeps_agreeing_tasks_sorted_by_agreement() {
        let observations = vec![
            // t1: 3/3 agree.
            observed("t1", "dog"),
            observed("t1", "Dog"),
            observed("t1", " dog "),
            // t2: 3/4 agree.
            observed("t2", "cat"),
            observed("t2", "cat"),
            observed("t2", "cat"),
            observed("t2", "lynx"),
            // t3: 1/3, no majority worth keeping.
            observed("t3", "red"),
            observed("t3", "green"),
            observed("t3", "blue"),
        ];
        let candidates = find_candidates(&observations, 0.7, 3);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].task_id, "t1");
        assert_eq!(candidates[0].agreement, 1.0);
        assert!(candidates[0]
            .majority_response
            .matches(&Response::text("dog")));
        assert_eq!(candidates[1].task_id, "t2");
        assert!((candidates[1].agreement - 0.75).abs() < 1e-9);
        assert_eq!(candidates[1].validations, 4);
    }

    #[test]
    fn discovery_drops_tasks_below_minimum_observations() {
        let observations = vec![observed("t1", "dog"), observed("t1", "dog")];
        assert!(find_candidates(&observations, 0.5, 3).is_empty());
        assert_eq!(find_candidates(&observations, 0.5, 2).len(), 1);
    }

    #[test]
    fn discovery_counts_normalized_text_as_one_answer() {
        let observations = vec![
            observed("t1", "  DOG"),
            observed("t1", "dog  "),
            observed("t1", "cat"),
        ];
        let candidates = find_candidates(&observations, 0.6, 2);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].agreement - 2.0 / 3.0).abs() < 1e-9);
    }
}
