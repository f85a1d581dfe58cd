//! The engine facade: the two call shapes exposed to the surrounding
//! service layer.
//!
//! [`QaEngine::validate`] scores one submission to completion: strategy
//! fusion, status decision, golden performance bookkeeping, and routing of
//! ambiguous results into the consensus engine. There is no partial result
//! and no hard failure path visible to the submitter; every submission
//! receives a quality/confidence/status triple.
//!
//! [`QaEngine::add_to_consensus`] enrolls an already-scored validation into
//! its task's consensus group directly, for callers that manage review
//! routing themselves.
//!
//! The engine performs no I/O. Golden examples, session history, and the
//! statistical baseline arrive pre-fetched on the request; the caller
//! persists the returned decisions.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::QaConfig;
use crate::consensus::{ConsensusDecision, ConsensusEngine};
use crate::golden::{GoldenExample, GoldenPerformance};
use crate::issue::Issue;
use crate::orchestrator::{self, ValidationStatus};
use crate::response::Response;
use crate::strategy::{BaselineSample, SessionSample, ValidationMethod};
use crate::task::TaskType;

/// One submission to validate, with its pre-fetched context.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRequest {
    /// Task the submission answers.
    pub task_id: String,
    /// Submitting session.
    pub session_id: String,
    /// Publisher that sourced the task.
    pub publisher_id: String,
    /// Declared task type.
    pub task_type: TaskType,
    /// The submitted response.
    pub response: Response,
    /// Reported completion time in milliseconds. Negative or zero values
    /// are scored as maximal bot suspicion, not rejected.
    pub elapsed_ms: i64,
    /// When set, only this strategy runs; inapplicability then surfaces as
    /// a zero-score assessment instead of being excluded.
    pub method: Option<ValidationMethod>,
    /// Golden example for the task, when one is on file.
    pub golden: Option<GoldenExample>,
    /// The session's recent submissions, newest first.
    pub history: Vec<SessionSample>,
    /// The publisher's recent validations for the statistical baseline.
    pub baseline: Vec<BaselineSample>,
    /// Evaluation instant; anchors the statistical trailing window.
    pub observed_at: DateTime<Utc>,
}

impl ValidationRequest {
    /// Creates a request with no optional context.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        session_id: impl Into<String>,
        publisher_id: impl Into<String>,
        task_type: TaskType,
        response: Response,
        elapsed_ms: i64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            session_id: session_id.into(),
            publisher_id: publisher_id.into(),
            task_type,
            response,
            elapsed_ms,
            method: None,
            golden: None,
            history: Vec::new(),
            baseline: Vec::new(),
            observed_at: Utc::now(),
        }
    }

    /// Restricts scoring to a single strategy.
    #[must_use]
    pub fn with_method(mut self, method: ValidationMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Attaches the task's golden example.
    #[must_use]
    pub fn with_golden(mut self, golden: GoldenExample) -> Self {
        self.golden = Some(golden);
        self
    }

    /// Attaches the session's recent submissions, newest first.
    #[must_use]
    pub fn with_history(mut self, history: Vec<SessionSample>) -> Self {
        self.history = history;
        self
    }

    /// Attaches the publisher's baseline validations.
    #[must_use]
    pub fn with_baseline(mut self, baseline: Vec<BaselineSample>) -> Self {
        self.baseline = baseline;
        self
    }
}

/// The finished verdict for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    /// Validation identifier.
    pub id: Uuid,
    /// Task the submission answered.
    pub task_id: String,
    /// Submitting session.
    pub session_id: String,
    /// Publisher that sourced the task.
    pub publisher_id: String,
    /// Fused quality in `[0, 1]`.
    pub quality_score: f64,
    /// Fused confidence in `[0, 1]`.
    pub confidence: f64,
    /// Verdict from the status decision table.
    pub status: ValidationStatus,
    /// Issues raised by every strategy that ran.
    pub issues: Vec<Issue>,
    /// Submitter-facing guidance, highest-priority strategy first.
    pub feedback: Option<String>,
    /// Strategies that contributed to the fused score, in weight order.
    pub methods: Vec<ValidationMethod>,
    /// Consensus group this validation was routed to, when the verdict was
    /// `needs_review`.
    pub consensus_group: Option<Uuid>,
    /// When the verdict was produced.
    pub created_at: DateTime<Utc>,
}

/// Validation engine: fusion, status decisions, consensus routing, and
/// golden performance analytics behind one facade.
#[derive(Debug)]
pub struct QaEngine {
    config: QaConfig,
    consensus: ConsensusEngine,
    golden_stats: RwLock<HashMap<String, GoldenPerformance>>,
}

impl QaEngine {
    /// Creates an engine from an already-validated configuration.
    #[must_use]
    pub fn new(config: QaConfig) -> Self {
        let consensus = ConsensusEngine::new(
            config.minimum_consensus_validators,
            config.consensus_required_agreement,
        );
        Self {
            config,
            consensus,
            golden_stats: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration this engine was built with.
    #[must_use]
    pub const fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Scores one submission to completion.
    ///
    /// A `needs_review` verdict is enrolled into the task's consensus group
    /// before being returned; the group id is stamped on the validation.
    pub fn validate(&self, request: ValidationRequest) -> Validation {
        let evaluation = orchestrator::evaluate(&request, &self.config);

        if let (Some(golden), Some(quality)) = (&request.golden, evaluation.golden_quality) {
            self.record_golden_performance(&request.task_id, quality, golden.allowed_variation);
        }

        let id = Uuid::new_v4();
        let consensus_group = if evaluation.status == ValidationStatus::NeedsReview {
            let decision =
                self.consensus
                    .add_to_consensus(&request.task_id, id, request.response.clone());
            Some(decision.group_id)
        } else {
            None
        };

        info!(
            validation_id = %id,
            task_id = %request.task_id,
            status = ?evaluation.status,
            quality = evaluation.quality,
            confidence = evaluation.confidence,
            routed_to_consensus = consensus_group.is_some(),
            "validation finalized"
        );

        Validation {
            id,
            task_id: request.task_id,
            session_id: request.session_id,
            publisher_id: request.publisher_id,
            quality_score: evaluation.quality,
            confidence: evaluation.confidence,
            status: evaluation.status,
            issues: evaluation.issues,
            feedback: evaluation.feedback,
            methods: evaluation.methods,
            consensus_group,
            created_at: request.observed_at,
        }
    }

    /// Enrolls a scored validation into its task's consensus group.
    pub fn add_to_consensus(
        &self,
        task_id: &str,
        validation_id: Uuid,
        response: Response,
    ) -> ConsensusDecision {
        self.consensus.add_to_consensus(task_id, validation_id, response)
    }

    /// Accumulated golden performance for a task, if any evaluations ran.
    pub fn golden_performance(&self, task_id: &str) -> Option<GoldenPerformance> {
        let stats = self
            .golden_stats
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        stats.get(task_id).copied()
    }

    fn record_golden_performance(&self, task_id: &str, quality: f64, allowed_variation: f64) {
        let mut stats = self
            .golden_stats
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        stats
            .entry(task_id.to_owned())
            .or_default()
            .record(quality, allowed_variation);
    }
}
