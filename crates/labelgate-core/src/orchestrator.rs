//! Strategy fusion and the validation status decision.
//!
//! The orchestrator runs the scoring strategies for one submission, fuses
//! their quality/confidence assessments with fixed weights, and maps the
//! fused pair onto a status through a pure decision table:
//!
//! ```text
//! confidence >= HIGH,   quality >= 0.7  => validated
//! confidence >= HIGH,   quality <  0.7  => rejected
//! confidence <  HIGH                    => needs_review
//! ```
//!
//! Strategies are independent pure reads of caller-supplied baseline data,
//! so the fusion itself holds no state and performs no I/O. An inapplicable
//! strategy (no golden example on file) is excluded from fusion rather than
//! penalized; only an explicitly requested method surfaces inapplicability
//! as a zero-score assessment.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QaConfig;
use crate::engine::ValidationRequest;
use crate::issue::Issue;
use crate::strategy::{
    Assessment, BotContext, BotDetectionStrategy, GoldenSetStrategy, StatisticalStrategy,
    StatsContext, StrategyOutcome, ThresholdContext, ThresholdStrategy, ValidationMethod,
};

/// Quality floor separating `validated` from `rejected` once confidence is
/// high. The boundary is inclusive: exactly 0.7 validates.
const VALIDATION_QUALITY_FLOOR: f64 = 0.7;

/// Fusion weights when a golden example is on file.
const GOLDEN_WEIGHTS: [(ValidationMethod, f64); 4] = [
    (ValidationMethod::GoldenSet, 0.5),
    (ValidationMethod::Threshold, 0.2),
    (ValidationMethod::BotDetection, 0.2),
    (ValidationMethod::Statistical, 0.1),
];

/// Fusion weights when no golden example exists.
const DEFAULT_WEIGHTS: [(ValidationMethod, f64); 3] = [
    (ValidationMethod::Threshold, 0.4),
    (ValidationMethod::BotDetection, 0.3),
    (ValidationMethod::Statistical, 0.3),
];

/// Feedback priority when several strategies produce guidance.
const FEEDBACK_PRIORITY: [ValidationMethod; 4] = [
    ValidationMethod::GoldenSet,
    ValidationMethod::BotDetection,
    ValidationMethod::Threshold,
    ValidationMethod::Statistical,
];

/// Outcome of the status decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Not yet decided; the initial state of a stored validation.
    Pending,
    /// High confidence and acceptable quality.
    Validated,
    /// High confidence that the quality is unacceptable.
    Rejected,
    /// Ambiguous; routed to the consensus engine.
    NeedsReview,
}

/// Fused result of one orchestrator run, before persistence concerns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub quality: f64,
    pub confidence: f64,
    pub issues: Vec<Issue>,
    pub feedback: Option<String>,
    pub status: ValidationStatus,
    /// Methods that contributed to the fused score, in weight order.
    pub methods: Vec<ValidationMethod>,
    /// The golden strategy's own quality, when it ran and was applicable.
    /// Feeds per-example performance analytics, not the fused score.
    pub golden_quality: Option<f64>,
}

/// Runs strategy selection, fusion, and the status decision for one request.
pub(crate) fn evaluate(request: &ValidationRequest, config: &QaConfig) -> Evaluation {
    let (weighted, feedback) = match request.method {
        Some(method) => {
            let assessment = run_strategy(request, method).into_assessment();
            let feedback = assessment.feedback.clone();
            (vec![(method, 1.0, assessment)], feedback)
        },
        None => fuse_all(request),
    };

    let golden_quality = weighted.iter().find_map(|(method, _, assessment)| {
        (*method == ValidationMethod::GoldenSet).then_some(assessment.quality)
    });

    let total_weight: f64 = weighted.iter().map(|(_, weight, _)| weight).sum();
    let mut quality = 0.0;
    let mut confidence = 0.0;
    let mut issues = Vec::new();
    let mut methods = Vec::new();
    for (method, weight, assessment) in weighted {
        quality += weight * assessment.quality;
        confidence += weight * assessment.confidence;
        issues.extend(assessment.issues);
        methods.push(method);
    }
    if total_weight > 0.0 {
        quality /= total_weight;
        confidence /= total_weight;
    }

    let status = determine_status(quality, confidence, config);
    debug!(
        task_id = %request.task_id,
        quality,
        confidence,
        ?status,
        methods = methods.len(),
        "validation evaluated"
    );
    Evaluation {
        quality,
        confidence,
        issues,
        feedback,
        status,
        methods,
        golden_quality,
    }
}

/// Runs all applicable strategies and pairs each with its fusion weight.
/// Returns the weighted assessments and the highest-priority feedback.
fn fuse_all(request: &ValidationRequest) -> (Vec<(ValidationMethod, f64, Assessment)>, Option<String>) {
    let golden = GoldenSetStrategy::new().evaluate(request.golden.as_ref(), &request.response);
    let weights: &[(ValidationMethod, f64)] = if golden.assessment().is_some() {
        &GOLDEN_WEIGHTS
    } else {
        &DEFAULT_WEIGHTS
    };

    let mut weighted = Vec::with_capacity(weights.len());
    for &(method, weight) in weights {
        let assessment = match method {
            ValidationMethod::GoldenSet => golden.clone().into_assessment(),
            _ => run_strategy(request, method).into_assessment(),
        };
        weighted.push((method, weight, assessment));
    }

    let feedback = FEEDBACK_PRIORITY.iter().find_map(|priority| {
        weighted.iter().find_map(|(method, _, assessment)| {
            (method == priority).then(|| assessment.feedback.clone()).flatten()
        })
    });
    (weighted, feedback)
}

fn run_strategy(request: &ValidationRequest, method: ValidationMethod) -> StrategyOutcome {
    match method {
        ValidationMethod::GoldenSet => {
            GoldenSetStrategy::new().evaluate(request.golden.as_ref(), &request.response)
        },
        ValidationMethod::BotDetection => BotDetectionStrategy::new().evaluate(&BotContext {
            response: &request.response,
            elapsed_ms: request.elapsed_ms,
            task_type: &request.task_type,
            history: &request.history,
        }),
        ValidationMethod::Statistical => StatisticalStrategy::new().evaluate(&StatsContext {
            response: &request.response,
            elapsed_ms: request.elapsed_ms,
            task_type: &request.task_type,
            baseline: &request.baseline,
            now: request.observed_at,
        }),
        ValidationMethod::Threshold => ThresholdStrategy::new().evaluate(&ThresholdContext {
            response: &request.response,
            elapsed_ms: request.elapsed_ms,
            task_type: &request.task_type,
        }),
    }
}

/// Pure status decision. High confidence finalizes the verdict either way;
/// anything below the high threshold needs independent review.
#[must_use]
pub fn determine_status(quality: f64, confidence: f64, config: &QaConfig) -> ValidationStatus {
    if confidence >= config.high_confidence_threshold {
        if quality >= VALIDATION_QUALITY_FLOOR {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Rejected
        }
    } else {
        ValidationStatus::NeedsReview
    }
}
