//! Statistical baseline strategy.
//!
//! Compares one submission against the empirical distribution of recent
//! submissions for the same publisher and task type. Three independent
//! z-score-style checks (response time, content distribution, and response
//! length) combine into one quality/confidence pair. With no usable
//! baseline the strategy returns a maximally uninformative (0.5, 0.3)
//! verdict, which must not be mistaken for "average quality".

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::issue::{Issue, IssueKind};
use crate::response::Response;
use crate::strategy::{Assessment, StrategyOutcome};
use crate::task::TaskType;

/// Weight of the response-time check.
const TIME_WEIGHT: f64 = 0.3;

/// Weight of the content-distribution check.
const CONTENT_WEIGHT: f64 = 0.5;

/// Weight of the length-outlier check.
const OUTLIER_WEIGHT: f64 = 0.2;

/// Trailing window of baseline history considered, in days.
const BASELINE_WINDOW_DAYS: i64 = 7;

/// Neutral verdict when no baseline exists.
const NO_BASELINE: (f64, f64) = (0.5, 0.3);

/// One prior validation from the publisher's recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSample {
    /// Task type of the prior submission.
    pub task_type: TaskType,
    /// The prior response, when recorded.
    pub response: Option<Response>,
    /// Elapsed time of the prior submission, when recorded.
    pub elapsed_ms: Option<i64>,
    /// When the prior validation was observed.
    pub observed_at: DateTime<Utc>,
}

/// Context for one statistical evaluation.
#[derive(Debug, Clone)]
pub struct StatsContext<'a> {
    /// The response under evaluation.
    pub response: &'a Response,
    /// Elapsed time of the submission in milliseconds.
    pub elapsed_ms: i64,
    /// Declared task type; the baseline is filtered to matching samples.
    pub task_type: &'a TaskType,
    /// Recent validations for the same publisher, any task type. The caller
    /// fetches these; no I/O happens here.
    pub baseline: &'a [BaselineSample],
    /// Evaluation instant anchoring the trailing window.
    pub now: DateTime<Utc>,
}

/// Per-check verdict: quality, confidence, issues.
type CheckResult = (f64, f64, Vec<Issue>);

/// Statistical baseline strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalStrategy;

impl StatisticalStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scores one submission against the publisher's recent distribution.
    #[must_use]
    pub fn evaluate(&self, ctx: &StatsContext<'_>) -> StrategyOutcome {
        let window_start = ctx.now - Duration::days(BASELINE_WINDOW_DAYS);
        let baseline: Vec<&BaselineSample> = ctx
            .baseline
            .iter()
            .filter(|sample| sample.task_type == *ctx.task_type)
            .filter(|sample| sample.observed_at >= window_start && sample.observed_at <= ctx.now)
            .collect();

        if baseline.is_empty() {
            debug!(task_type = %ctx.task_type, "no statistical baseline available");
            return StrategyOutcome::Applicable(Assessment {
                quality: NO_BASELINE.0,
                confidence: NO_BASELINE.1,
                issues: Vec::new(),
                feedback: None,
            });
        }

        let (time_q, time_c, time_issues) = analyze_response_time(ctx.elapsed_ms, &baseline);
        let (content_q, content_c, content_issues) =
            analyze_content(ctx.response, ctx.task_type, &baseline);
        let (outlier_q, outlier_c, outlier_issues) =
            analyze_length_outlier(ctx.response, &baseline);

        let quality =
            TIME_WEIGHT * time_q + CONTENT_WEIGHT * content_q + OUTLIER_WEIGHT * outlier_q;
        let confidence =
            TIME_WEIGHT * time_c + CONTENT_WEIGHT * content_c + OUTLIER_WEIGHT * outlier_c;

        let mut issues = time_issues;
        issues.extend(content_issues);
        issues.extend(outlier_issues);

        let feedback = (!issues.is_empty())
            .then(|| "Your response significantly differs from typical patterns.".to_owned());

        StrategyOutcome::Applicable(Assessment {
            quality,
            confidence,
            issues,
            feedback,
        })
    }
}

/// Mean and sample standard deviation. A single-sample distribution falls
/// back to half the mean as its spread.
fn mean_and_stdev(values: &[f64]) -> (f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let stdev = if values.len() > 1 {
        let variance = values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (values.len() - 1) as f64;
        variance.sqrt()
    } else {
        mean * 0.5
    };
    (mean, stdev)
}

fn z_score(value: f64, mean: f64, stdev: f64) -> f64 {
    if stdev > 0.0 {
        (value - mean) / stdev
    } else if value == mean {
        0.0
    } else {
        f64::INFINITY * (value - mean).signum()
    }
}

fn analyze_response_time(elapsed_ms: i64, baseline: &[&BaselineSample]) -> CheckResult {
    let times: Vec<f64> = baseline
        .iter()
        .filter_map(|sample| sample.elapsed_ms)
        .map(|ms| ms as f64)
        .collect();
    if times.is_empty() {
        return (NO_BASELINE.0, NO_BASELINE.1, Vec::new());
    }

    let (mean, stdev) = mean_and_stdev(&times);
    let z = z_score(elapsed_ms as f64, mean, stdev);

    if z.abs() > 3.0 {
        let issue = Issue::new(
            IssueKind::UnusualResponseTime,
            format!("response time {elapsed_ms} ms is unusual (baseline mean {mean:.0} ms)"),
        )
        .with_z_score(z);
        (0.3, 0.8, vec![issue])
    } else if z.abs() > 2.0 {
        (0.5, 0.7, Vec::new())
    } else if z.abs() > 1.0 {
        (0.7, 0.6, Vec::new())
    } else {
        (0.9, 0.8, Vec::new())
    }
}

/// Content check dispatch. Multiple choice uses response-frequency lookup;
/// open text is a stub returning a constant until a real language model
/// backs it; everything else gets a mildly positive default.
fn analyze_content(
    response: &Response,
    task_type: &TaskType,
    baseline: &[&BaselineSample],
) -> CheckResult {
    match (task_type, response) {
        (TaskType::MultipleChoice, Response::Text(text)) => {
            analyze_choice_frequency(text, baseline)
        },
        (TaskType::OpenText, Response::Text(_)) => (0.7, 0.5, Vec::new()),
        _ => (0.7, 0.5, Vec::new()),
    }
}

fn analyze_choice_frequency(text: &str, baseline: &[&BaselineSample]) -> CheckResult {
    let prior: Vec<&str> = baseline
        .iter()
        .filter_map(|sample| match &sample.response {
            Some(Response::Text(t)) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    if prior.is_empty() {
        return (NO_BASELINE.0, NO_BASELINE.1, Vec::new());
    }

    let occurrences = prior.iter().filter(|p| **p == text).count();
    let frequency = occurrences as f64 / prior.len() as f64;

    if occurrences == 0 {
        let issue = Issue::new(
            IssueKind::UnusualResponse,
            "this response has not been observed in similar tasks",
        );
        (0.4, 0.6, vec![issue])
    } else if frequency < 0.1 {
        (0.6, 0.7, Vec::new())
    } else {
        (0.8, 0.8, Vec::new())
    }
}

/// Generic outlier check on response length; only meaningful for text.
fn analyze_length_outlier(response: &Response, baseline: &[&BaselineSample]) -> CheckResult {
    let Response::Text(text) = response else {
        return (0.7, 0.4, Vec::new());
    };
    let lengths: Vec<f64> = baseline
        .iter()
        .filter_map(|sample| match &sample.response {
            Some(Response::Text(t)) => Some(t.chars().count() as f64),
            _ => None,
        })
        .collect();
    if lengths.is_empty() {
        return (0.7, 0.4, Vec::new());
    }

    let (mean, stdev) = mean_and_stdev(&lengths);
    let current = text.chars().count() as f64;
    let z = z_score(current, mean, stdev);

    if z.abs() > 3.0 {
        let issue = Issue::new(
            IssueKind::UnusualResponseLength,
            format!(
                "response length {current:.0} is unusually different from the baseline mean {mean:.0}"
            ),
        )
        .with_z_score(z);
        (0.4, 0.7, vec![issue])
    } else if z.abs() > 2.0 {
        (0.6, 0.6, Vec::new())
    } else {
        (0.8, 0.7, Vec::new())
    }
}
