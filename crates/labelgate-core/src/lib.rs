//! Validation decision engine and consensus state machine for crowdsourced
//! label quality assurance.
//!
//! Given a worker's response to a labeling task, the engine decides, without
//! human review in the common case, whether the response is trustworthy, and
//! routes ambiguous cases into a multi-party agreement process.
//!
//! # Components
//!
//! - **Response comparator** ([`compare`]): structural similarity scoring
//!   between two response values of any supported shape.
//! - **Scoring strategies** ([`strategy`]): golden-set comparison, bot
//!   detection, statistical baseline checks, and fixed-threshold checks, each
//!   a pure function of its own explicit context.
//! - **Orchestrator** ([`orchestrator`]): selects strategies, fuses their
//!   outputs into one quality/confidence verdict, and maps the pair to a
//!   validation status.
//! - **Consensus engine** ([`consensus`]): a per-task state machine that
//!   accumulates validations routed to it and resolves them by pairwise
//!   agreement.
//! - **Engine facade** ([`engine`]): the two call shapes exposed to the
//!   surrounding service layer, `validate` and `add_to_consensus`.
//!
//! # Decision Flow
//!
//! ```text
//! +------------+     +------------+     +--------------+
//! | Submission | --> | Strategies | --> | Orchestrator |
//! +------------+     +------------+     +--------------+
//!                                              |
//!                             validated / rejected ... needs_review
//!                                              |              |
//!                                          (final)    +-----------------+
//!                                                     | ConsensusEngine |
//!                                                     +-----------------+
//! ```
//!
//! # Guarantees
//!
//! - Every submission receives a quality/confidence/status triple; the engine
//!   has no request-time hard-failure path. Wrong-shape answers, missing
//!   baselines and missing golden examples degrade scores, they never error.
//! - Quality and confidence are always within `[0, 1]`.
//! - Consensus groups only move forward: terminal states are sticky and
//!   recomputation on a terminal group is idempotent.
//! - The only fatal error class is configuration validation
//!   ([`config::ConfigError`]), rejected at construction time.
//!
//! # Example
//!
//! ```rust
//! use labelgate_core::config::QaConfig;
//! use labelgate_core::engine::{QaEngine, ValidationRequest};
//! use labelgate_core::response::Response;
//! use labelgate_core::task::TaskType;
//!
//! let engine = QaEngine::new(QaConfig::default());
//! let request = ValidationRequest::new(
//!     "task-001",
//!     "session-001",
//!     "publisher-001",
//!     TaskType::MultipleChoice,
//!     Response::text("dog"),
//!     2_400,
//! );
//! let validation = engine.validate(request);
//! assert!((0.0..=1.0).contains(&validation.quality_score));
//! ```

pub mod compare;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod golden;
pub mod issue;
pub mod orchestrator;
pub mod response;
pub mod strategy;
pub mod task;

pub use config::{ConfigError, QaConfig};
pub use consensus::{ConsensusDecision, ConsensusEngine, ConsensusStatus};
pub use engine::{QaEngine, Validation, ValidationRequest};
pub use golden::{GoldenExample, GoldenSetError};
pub use issue::{Issue, IssueKind};
pub use orchestrator::ValidationStatus;
pub use response::Response;
pub use strategy::ValidationMethod;
pub use task::TaskType;
