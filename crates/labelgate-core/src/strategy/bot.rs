//! Bot-detection strategy.
//!
//! Produces a suspicion score in `[0, 1]` (1 = certainly automated) from
//! three weighted sub-checks: implausible response time, repetition across
//! the session's recent history, and random-input content heuristics.
//! Quality is the inverse of suspicion; confidence is lowest at the midpoint
//! and highest at either extreme: the detector is most sure of itself when
//! it is most sure of bot-or-human.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::issue::{Issue, IssueKind};
use crate::response::Response;
use crate::strategy::{Assessment, StrategyOutcome};
use crate::task::TaskType;

/// Weight of the response-time sub-check.
const TIME_WEIGHT: f64 = 0.4;

/// Weight of the pattern-repetition sub-check.
const PATTERN_WEIGHT: f64 = 0.3;

/// Weight of the random-input sub-check.
const RANDOMNESS_WEIGHT: f64 = 0.3;

/// A sub-check above this suspicion emits an issue; overall suspicion above
/// it emits worker feedback.
const ISSUE_THRESHOLD: f64 = 0.8;

/// How many recent session submissions feed the repetition check.
pub const SESSION_HISTORY_WINDOW: usize = 5;

/// Minimum response-time samples required for cadence analysis.
const MIN_CADENCE_SAMPLES: usize = 3;

/// Identical-character run length treated as keyboard mashing.
const MASH_RUN_LEN: usize = 5;

/// Consonant-cluster length beyond which text looks random.
const CONSONANT_CLUSTER_LEN: usize = 6;

static CONSONANT_CLUSTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[bcdfghjklmnpqrstvwxyz]{5,}").expect("consonant cluster regex is valid")
});

/// One prior submission from the same session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSample {
    /// The response that was submitted.
    pub response: Response,
    /// Elapsed time of that submission, when recorded.
    pub elapsed_ms: Option<i64>,
}

/// Context for one bot-detection evaluation.
#[derive(Debug, Clone)]
pub struct BotContext<'a> {
    /// The response under evaluation.
    pub response: &'a Response,
    /// Elapsed time of the submission in milliseconds. Zero or negative is
    /// treated as maximal time suspicion, not rejected.
    pub elapsed_ms: i64,
    /// Declared task type.
    pub task_type: &'a TaskType,
    /// The session's most recent submissions, newest first. Only the first
    /// [`SESSION_HISTORY_WINDOW`] entries are considered.
    pub history: &'a [SessionSample],
}

/// Bot-detection strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BotDetectionStrategy;

impl BotDetectionStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scores one submission for automation likelihood.
    #[must_use]
    pub fn evaluate(&self, ctx: &BotContext<'_>) -> StrategyOutcome {
        let mut issues = Vec::new();

        let time_suspicion = time_suspicion(ctx.elapsed_ms, ctx.task_type);
        if time_suspicion > ISSUE_THRESHOLD {
            issues.push(
                Issue::new(
                    IssueKind::SuspiciouslyFastResponse,
                    format!("response submitted unusually quickly ({} ms)", ctx.elapsed_ms),
                )
                .with_score_impact(time_suspicion),
            );
        }

        let pattern_suspicion = pattern_suspicion(ctx.response, ctx.history);
        if pattern_suspicion > ISSUE_THRESHOLD {
            issues.push(Issue::new(
                IssueKind::RepetitivePattern,
                "suspiciously similar to previous submissions in this session",
            ));
        }

        let randomness_suspicion = randomness_suspicion(ctx.response);
        if randomness_suspicion > ISSUE_THRESHOLD {
            issues.push(Issue::new(
                IssueKind::RandomInput,
                "response pattern suggests random clicking or input",
            ));
        }

        let suspicion = TIME_WEIGHT * time_suspicion
            + PATTERN_WEIGHT * pattern_suspicion
            + RANDOMNESS_WEIGHT * randomness_suspicion;

        let feedback = (suspicion > ISSUE_THRESHOLD).then(|| {
            "Your response appears automated. Please take more time to consider your answers."
                .to_owned()
        });

        StrategyOutcome::Applicable(Assessment {
            quality: 1.0 - suspicion,
            confidence: 0.5 + (suspicion - 0.5).abs(),
            issues,
            feedback,
        })
    }
}

/// Time suspicion: 1.0 below half the task-type minimum, a linear ramp up to
/// the minimum, 0.0 beyond it. Non-positive elapsed time is maximally
/// suspicious.
fn time_suspicion(elapsed_ms: i64, task_type: &TaskType) -> f64 {
    let min_time = task_type.min_expected_time_ms();
    if elapsed_ms <= 0 {
        1.0
    } else if elapsed_ms < min_time / 2 {
        1.0
    } else if elapsed_ms < min_time {
        0.5 + 0.5 * (1.0 - elapsed_ms as f64 / min_time as f64)
    } else {
        0.0
    }
}

/// Pattern suspicion: 1.0 if the current response repeats any recent one;
/// otherwise a cadence check on response-time variation.
fn pattern_suspicion(response: &Response, history: &[SessionSample]) -> f64 {
    let window = &history[..history.len().min(SESSION_HISTORY_WINDOW)];
    if window.len() < 2 {
        return 0.0;
    }

    if window
        .iter()
        .any(|sample| sample.response.matches(response))
    {
        return 1.0;
    }

    let times: Vec<f64> = window
        .iter()
        .filter_map(|sample| sample.elapsed_ms)
        .map(|ms| ms as f64)
        .collect();
    if times.len() >= MIN_CADENCE_SAMPLES {
        cadence_suspicion(&times)
    } else {
        0.0
    }
}

/// Coefficient-of-variation cadence check: near-identical response times are
/// bot-like.
fn cadence_suspicion(times: &[f64]) -> f64 {
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    // Sample standard deviation (n - 1 denominator).
    let variance = times
        .iter()
        .map(|t| (t - mean).powi(2))
        .sum::<f64>()
        / (times.len() - 1) as f64;
    let stdev = variance.sqrt();
    if stdev == 0.0 {
        return 1.0;
    }
    let cv = stdev / mean;
    if cv < 0.1 {
        0.9
    } else if cv < 0.2 {
        0.7
    } else {
        0.0
    }
}

/// Randomness suspicion: text-only heuristics for keyboard mashing; other
/// shapes are not evaluated.
fn randomness_suspicion(response: &Response) -> f64 {
    match response {
        Response::Text(text) => keyboard_mashing_suspicion(text),
        _ => 0.0,
    }
}

fn keyboard_mashing_suspicion(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 1.0;
    }
    // The regex crate has no backreferences, so identical-character runs are
    // scanned directly.
    if max_identical_run(text) >= MASH_RUN_LEN {
        return 0.8;
    }
    let lower = text.to_lowercase();
    let longest_cluster = CONSONANT_CLUSTERS
        .find_iter(&lower)
        .map(|m| m.as_str().len())
        .max()
        .unwrap_or(0);
    if longest_cluster > CONSONANT_CLUSTER_LEN {
        return 0.7;
    }
    0.0
}

fn max_identical_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;
    for ch in text.chars() {
        if previous == Some(ch) {
            current += 1;
        } else {
            current = 1;
            previous = Some(ch);
        }
        longest = longest.max(current);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        response: &'a Response,
        elapsed_ms: i64,
        task_type: &'a TaskType,
        history: &'a [SessionSample],
    ) -> BotContext<'a> {
        BotContext {
            response,
            elapsed_ms,
            task_type,
            history,
        }
    }

    fn assessment(outcome: StrategyOutcome) -> Assessment {
        outcome.into_assessment()
    }

    // =========================================================================
    // Time suspicion
    // =========================================================================

    #[test]
    fn instant_response_is_maximally_suspicious() {
        assert_eq!(time_suspicion(0, &TaskType::Vqa), 1.0);
        assert_eq!(time_suspicion(-50, &TaskType::Vqa), 1.0);
        assert_eq!(time_suspicion(50, &TaskType::Vqa), 1.0);
    }

    #[test]
    fn below_minimum_ramps_linearly() {
        // vqa minimum 2000 ms; at 1500 ms: 0.5 + 0.5 * (1 - 0.75) = 0.625.
        let suspicion = time_suspicion(1_500, &TaskType::Vqa);
        assert!((suspicion - 0.625).abs() < 1e-9);
    }

    #[test]
    fn reasonable_time_is_not_suspicious() {
        assert_eq!(time_suspicion(2_500, &TaskType::Vqa), 0.0);
    }

    // =========================================================================
    // Pattern suspicion
    // =========================================================================

    #[test]
    fn short_history_detects_nothing() {
        let history = [SessionSample {
            response: Response::text("a"),
            elapsed_ms: Some(1_000),
        }];
        assert_eq!(pattern_suspicion(&Response::text("a"), &history), 0.0);
    }

    #[test]
    fn repeated_response_is_certain_repetition() {
        let history = vec![
            SessionSample {
                response: Response::text("  DOG "),
                elapsed_ms: Some(1_200),
            },
            SessionSample {
                response: Response::text("cat"),
                elapsed_ms: Some(2_300),
            },
        ];
        assert_eq!(pattern_suspicion(&Response::text("dog"), &history), 1.0);
    }

    #[test]
    fn constant_cadence_is_suspicious() {
        let history: Vec<SessionSample> = (0..4)
            .map(|i| SessionSample {
                response: Response::text(format!("answer {i}")),
                elapsed_ms: Some(1_000),
            })
            .collect();
        assert_eq!(pattern_suspicion(&Response::text("fresh"), &history), 1.0);
    }

    #[test]
    fn low_variation_cadence_scores_point_nine() {
        let times = [1_000.0, 1_010.0, 990.0, 1_005.0];
        assert_eq!(cadence_suspicion(&times), 0.9);
    }

    #[test]
    fn natural_variation_is_fine() {
        let times = [800.0, 1_500.0, 2_600.0];
        assert_eq!(cadence_suspicion(&times), 0.0);
    }

    // =========================================================================
    // Randomness suspicion
    // =========================================================================

    #[test]
    fn empty_text_is_maximally_suspicious() {
        assert_eq!(randomness_suspicion(&Response::text("   ")), 1.0);
    }

    #[test]
    fn identical_run_detected() {
        assert_eq!(randomness_suspicion(&Response::text("aaaaah okay")), 0.8);
    }

    #[test]
    fn consonant_cluster_detected() {
        assert_eq!(randomness_suspicion(&Response::text("sdkfjghqw")), 0.7);
    }

    #[test]
    fn normal_text_is_fine() {
        assert_eq!(
            randomness_suspicion(&Response::text("a golden retriever")),
            0.0
        );
    }

    #[test]
    fn non_text_shapes_are_not_evaluated() {
        assert_eq!(randomness_suspicion(&Response::from(3.0)), 0.0);
    }

    // =========================================================================
    // Combined assessment
    // =========================================================================

    #[test]
    fn fast_empty_text_flags_issues_and_feedback() {
        let response = Response::text("");
        let task = TaskType::Vqa;
        let result = assessment(
            BotDetectionStrategy::new().evaluate(&ctx(&response, 10, &task, &[])),
        );
        // time 1.0, pattern 0.0, randomness 1.0: suspicion 0.7... wait:
        // 0.4*1.0 + 0.3*0.0 + 0.3*1.0 = 0.7; quality 0.3, confidence 0.7.
        assert!((result.quality - 0.3).abs() < 1e-9);
        assert!((result.confidence - 0.7).abs() < 1e-9);
        assert!(result
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::SuspiciouslyFastResponse));
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::RandomInput));
        assert!(result.feedback.is_none());
    }

    #[test]
    fn clean_submission_scores_full_quality() {
        let response = Response::text("a dog playing fetch");
        let task = TaskType::Vqa;
        let result = assessment(
            BotDetectionStrategy::new().evaluate(&ctx(&response, 4_000, &task, &[])),
        );
        assert_eq!(result.quality, 1.0);
        assert_eq!(result.confidence, 1.0);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn repeated_response_alone_does_not_trigger_feedback() {
        let history = vec![
            SessionSample {
                response: Response::text("same"),
                elapsed_ms: Some(100),
            },
            SessionSample {
                response: Response::text("same"),
                elapsed_ms: Some(100),
            },
        ];
        let repeated = Response::text("same");
        let task = TaskType::Vqa;
        let result = assessment(
            BotDetectionStrategy::new().evaluate(&ctx(&repeated, 10, &task, &history)),
        );
        // time 1.0, pattern 1.0, randomness 0.0 => suspicion 0.7, below the
        // 0.8 feedback threshold.
        assert!((result.quality - 0.3).abs() < 1e-9);
        assert!(result.feedback.is_none());
    }

    #[test]
    fn certain_bot_produces_feedback() {
        let history = vec![
            SessionSample {
                response: Response::text("aaaaaaa"),
                elapsed_ms: Some(100),
            },
            SessionSample {
                response: Response::text("aaaaaaa"),
                elapsed_ms: Some(100),
            },
        ];
        let mash = Response::text("aaaaaaa");
        let task = TaskType::Vqa;
        let result = assessment(
            BotDetectionStrategy::new().evaluate(&ctx(&mash, 10, &task, &history)),
        );
        // time 1.0, pattern 1.0, randomness 0.8 => suspicion 0.94.
        assert!((result.quality - 0.06).abs() < 1e-9);
        assert!((result.confidence - 0.94).abs() < 1e-9);
        assert!(result.feedback.is_some());
    }

    #[test]
    fn history_beyond_window_is_ignored() {
        let mut history: Vec<SessionSample> = (0..SESSION_HISTORY_WINDOW)
            .map(|i| SessionSample {
                response: Response::text(format!("answer {i}")),
                elapsed_ms: Some(1_000 + 400 * i as i64),
            })
            .collect();
        // A matching response parked outside the window must not trigger the
        // repetition check.
        history.push(SessionSample {
            response: Response::text("current"),
            elapsed_ms: Some(900),
        });
        let suspicion = pattern_suspicion(&Response::text("current"), &history);
        assert!(suspicion < 1.0);
    }
}
