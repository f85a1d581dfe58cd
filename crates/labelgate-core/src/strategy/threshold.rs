//! Fixed-threshold strategy.
//!
//! The fallback strategy, always applicable. Three independent quality
//! factors (minimum-time compliance, format well-formedness for the
//! declared task type, and crude content-quality heuristics) are
//! *multiplied* rather than averaged, so a single severe defect dominates
//! the score. Confidence is a fixed 0.8: thresholds are deterministic rules,
//! not statistical inference, hence neither maximal nor minimal confidence.

use std::sync::LazyLock;

use regex::Regex;

use crate::issue::{Issue, IssueKind};
use crate::response::Response;
use crate::strategy::{Assessment, StrategyOutcome};
use crate::task::TaskType;

/// Fixed confidence of every threshold verdict.
const THRESHOLD_CONFIDENCE: f64 = 0.8;

/// Quality factor for a non-positive elapsed time.
const INVALID_TIME_FACTOR: f64 = 0.3;

/// Minimum trimmed length of an open-text answer.
const MIN_OPEN_TEXT_LEN: usize = 5;

/// Content-quality factors below this emit an issue.
const CONTENT_ISSUE_THRESHOLD: f64 = 0.7;

static WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]{1,20}\b").expect("word regex is valid"));

/// Context for one threshold evaluation.
#[derive(Debug, Clone)]
pub struct ThresholdContext<'a> {
    /// The response under evaluation.
    pub response: &'a Response,
    /// Elapsed time of the submission in milliseconds.
    pub elapsed_ms: i64,
    /// Declared task type.
    pub task_type: &'a TaskType,
}

/// Fixed-threshold strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdStrategy;

impl ThresholdStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scores one submission against the fixed rules.
    #[must_use]
    pub fn evaluate(&self, ctx: &ThresholdContext<'_>) -> StrategyOutcome {
        let mut issues = Vec::new();
        let mut quality = 1.0;

        let (time_factor, time_issues) = check_minimum_time(ctx.elapsed_ms, ctx.task_type);
        quality *= time_factor;
        issues.extend(time_issues);

        let (format_factor, format_issues) = check_format(ctx.response, ctx.task_type);
        quality *= format_factor;
        issues.extend(format_issues);

        let (content_factor, content_issues) = check_content(ctx.response, ctx.task_type);
        quality *= content_factor;
        issues.extend(content_issues);

        let feedback = (!issues.is_empty())
            .then(|| "Please ensure your response meets our requirements.".to_owned());

        StrategyOutcome::Applicable(Assessment {
            quality,
            confidence: THRESHOLD_CONFIDENCE,
            issues,
            feedback,
        })
    }
}

fn check_minimum_time(elapsed_ms: i64, task_type: &TaskType) -> (f64, Vec<Issue>) {
    let min_time = task_type.min_threshold_time_ms();
    if elapsed_ms >= min_time {
        return (1.0, Vec::new());
    }

    let issue = Issue::new(
        IssueKind::InsufficientTime,
        format!(
            "response time ({elapsed_ms} ms) is below the minimum expected time ({min_time} ms)"
        ),
    );
    if elapsed_ms <= 0 {
        (INVALID_TIME_FACTOR, vec![issue])
    } else {
        // Scale from 0.5 toward 0.9 as the time approaches the threshold.
        let factor = (0.5 + 0.4 * elapsed_ms as f64 / min_time as f64).min(0.9);
        (factor, vec![issue])
    }
}

fn check_format(response: &Response, task_type: &TaskType) -> (f64, Vec<Issue>) {
    match task_type {
        TaskType::MultipleChoice => match response {
            Response::Text(text) if !text.is_empty() => (1.0, Vec::new()),
            Response::Number(_) => (1.0, Vec::new()),
            _ => (
                0.5,
                vec![Issue::new(
                    IssueKind::InvalidFormat,
                    "multiple choice response must be a non-empty string or number",
                )],
            ),
        },
        TaskType::OpenText => match response {
            Response::Text(text) if text.trim().len() < MIN_OPEN_TEXT_LEN => (
                0.7,
                vec![Issue::new(
                    IssueKind::InsufficientContent,
                    "response is too short",
                )],
            ),
            Response::Text(_) => (1.0, Vec::new()),
            _ => (
                0.5,
                vec![Issue::new(
                    IssueKind::InvalidFormat,
                    "open text response must be a string",
                )],
            ),
        },
        TaskType::Vqa => match response {
            Response::Text(text) if !text.is_empty() => (1.0, Vec::new()),
            _ => (
                0.5,
                vec![Issue::new(
                    IssueKind::InvalidFormat,
                    "VQA response must be a non-empty string",
                )],
            ),
        },
        _ => (1.0, Vec::new()),
    }
}

fn check_content(response: &Response, task_type: &TaskType) -> (f64, Vec<Issue>) {
    let Response::Text(text) = response else {
        return (1.0, Vec::new());
    };

    let repetition = repetition_score(text);
    if repetition < CONTENT_ISSUE_THRESHOLD {
        return (
            repetition,
            vec![Issue::new(
                IssueKind::RepetitiveContent,
                "response contains excessive repetition",
            )],
        );
    }

    if *task_type == TaskType::OpenText && text.len() > 10 {
        let gibberish = gibberish_score(text);
        if gibberish < CONTENT_ISSUE_THRESHOLD {
            return (
                gibberish,
                vec![Issue::new(
                    IssueKind::LowQualityText,
                    "response appears to be low-quality or random text",
                )],
            );
        }
    }

    (1.0, Vec::new())
}

/// Quality score for repetitiveness: repeated character runs and a low
/// unique-word ratio drag it down.
fn repetition_score(text: &str) -> f64 {
    if text.len() < 5 {
        return 1.0;
    }

    if identical_runs(text, 4) > 2 {
        return 0.6;
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() >= 6 {
        let unique: std::collections::HashSet<&str> = words.iter().copied().collect();
        let unique_ratio = unique.len() as f64 / words.len() as f64;
        if unique_ratio < 0.3 {
            return 0.5;
        } else if unique_ratio < 0.5 {
            return 0.7;
        }
    }

    1.0
}

/// Number of runs of `min_len` or more identical characters.
fn identical_runs(text: &str, min_len: usize) -> usize {
    let mut runs = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;
    for ch in text.chars() {
        if previous == Some(ch) {
            current += 1;
        } else {
            if current >= min_len {
                runs += 1;
            }
            current = 1;
            previous = Some(ch);
        }
    }
    if current >= min_len {
        runs += 1;
    }
    runs
}

/// Crude gibberish heuristic on average word length. Real language clusters
/// around 4-6 characters; extreme averages suggest mashing.
fn gibberish_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let words: Vec<&str> = WORDS.find_iter(&lower).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return 0.5;
    }
    let avg_len =
        words.iter().map(|w| w.len()).sum::<usize>() as f64 / words.len() as f64;
    if !(2.5..=10.0).contains(&avg_len) {
        0.6
    } else {
        1.0
    }
}
