//! Consensus groups and the per-task agreement state machine.
//!
//! When a validation lands in the ambiguous confidence band, it is routed
//! here instead of being finalized. A group accumulates independent
//! validations for one task and resolves once enough evidence exists:
//!
//! ```text
//! pending --> in_progress --> completed   (agreement >= threshold)
//!                        \--> failed      (members >= 2 x required)
//! ```
//!
//! Agreement is the canonical pairwise definition: the fraction of pairwise
//! response comparisons among all members that match. It is 0.0 below two
//! members (no comparison possible), so a group can never resolve off a
//! single opinion. Terminal states are sticky: recomputation on a completed
//! or failed group is a no-op, which makes the add-member/recompute sequence
//! safe to redo after a racing writer.
//!
//! The engine serializes add+recompute per task id with a per-key mutex
//! inside a shared arena; groups for unrelated tasks never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::response::Response;

/// Lifecycle status of a consensus group. Only ever advances forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStatus {
    /// Fewer than two members; no agreement computable yet.
    Pending,
    /// Accumulating members; agreement checked on every addition.
    InProgress,
    /// Terminal: agreement reached the threshold. The consensus result and
    /// agreement level are frozen.
    Completed,
    /// Terminal: the member budget was exhausted without agreement.
    Failed,
}

impl ConsensusStatus {
    /// Returns `true` for the two terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One validation enrolled in a consensus group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMember {
    /// Identifier of the enrolled validation.
    pub validation_id: Uuid,
    /// The response that validation carried.
    pub response: Response,
}

/// The state of one task's consensus group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusGroup {
    /// Group identifier.
    pub id: Uuid,
    /// Task this group reconciles.
    pub task_id: String,
    /// Number of independent validations the group waits for.
    pub required_validations: u32,
    /// Pairwise agreement level required to complete.
    pub agreement_threshold: f64,
    /// Enrolled validations, append-only.
    pub members: Vec<ConsensusMember>,
    /// Current lifecycle status.
    pub status: ConsensusStatus,
    /// Last computed pairwise agreement level.
    pub agreement_level: f64,
    /// Majority response, present only once `completed`.
    pub consensus_result: Option<Response>,
}

impl ConsensusGroup {
    /// Creates an empty group for a task.
    #[must_use]
    pub fn new(task_id: impl Into<String>, required_validations: u32, agreement_threshold: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            required_validations,
            agreement_threshold,
            members: Vec::new(),
            status: ConsensusStatus::Pending,
            agreement_level: 0.0,
            consensus_result: None,
        }
    }

    /// Adds a member and advances the state machine.
    ///
    /// On a terminal group this is a no-op: the member is not enrolled and
    /// the frozen decision stands.
    pub fn add_member(&mut self, validation_id: Uuid, response: Response) {
        if self.status.is_terminal() {
            debug!(
                group_id = %self.id,
                task_id = %self.task_id,
                status = ?self.status,
                "ignoring member addition to terminal consensus group"
            );
            return;
        }
        self.members.push(ConsensusMember {
            validation_id,
            response,
        });
        self.recompute();
    }

    /// Recomputes agreement and applies any due transition.
    ///
    /// Idempotent: rerunning on an unchanged group, terminal or not, yields
    /// the same state.
    pub fn recompute(&mut self) {
        if self.status.is_terminal() {
            return;
        }

        let member_count = self.members.len();
        if member_count < 2 {
            self.agreement_level = 0.0;
            self.status = ConsensusStatus::Pending;
            return;
        }

        self.agreement_level = pairwise_agreement(&self.members);
        if self.agreement_level >= self.agreement_threshold {
            self.consensus_result = majority_response(&self.members);
            self.status = ConsensusStatus::Completed;
            info!(
                group_id = %self.id,
                task_id = %self.task_id,
                agreement = self.agreement_level,
                members = member_count,
                "consensus group completed"
            );
        } else if member_count >= 2 * self.required_validations as usize {
            self.status = ConsensusStatus::Failed;
            info!(
                group_id = %self.id,
                task_id = %self.task_id,
                agreement = self.agreement_level,
                members = member_count,
                "consensus group failed to reach agreement"
            );
        } else {
            self.status = ConsensusStatus::InProgress;
        }
    }
}

/// Fraction of matching pairwise response comparisons among all members.
fn pairwise_agreement(members: &[ConsensusMember]) -> f64 {
    let n = members.len();
    if n < 2 {
        return 0.0;
    }
    let mut matching = 0usize;
    let mut total = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            total += 1;
            if members[i].response.matches(&members[j].response) {
                matching += 1;
            }
        }
    }
    matching as f64 / total as f64
}

/// Most frequent response by canonical key; ties resolve to the earliest
/// enrolled representative so the selection is deterministic.
fn majority_response(members: &[ConsensusMember]) -> Option<Response> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (index, member) in members.iter().enumerate() {
        let entry = counts
            .entry(member.response.canonical_key())
            .or_insert((0, index));
        entry.0 += 1;
    }
    counts
        .into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, index)| members[index].response.clone())
}

/// The decision returned to the caller after an enrollment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    /// Identifier of the group the validation was routed to.
    pub group_id: Uuid,
    /// Group status after the enrollment.
    pub status: ConsensusStatus,
    /// Agreement level after the enrollment.
    pub agreement_level: f64,
    /// Majority response, present only when the group completed.
    pub consensus_result: Option<Response>,
}

/// Arena of consensus groups keyed by task id.
///
/// The outer map lock is held only long enough to fetch or create a group
/// handle; the per-group mutex serializes the add-member/recompute critical
/// section for one task while unrelated tasks proceed concurrently.
#[derive(Debug)]
pub struct ConsensusEngine {
    required_validations: u32,
    agreement_threshold: f64,
    groups: RwLock<HashMap<String, Arc<Mutex<ConsensusGroup>>>>,
}

impl ConsensusEngine {
    /// Creates an engine with the given group parameters.
    #[must_use]
    pub fn new(required_validations: u32, agreement_threshold: f64) -> Self {
        Self {
            required_validations,
            agreement_threshold,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Enrolls a validation into the task's consensus group, creating the
    /// group lazily on first use, and returns the post-enrollment decision.
    ///
    /// A validation arriving for a task whose group is already terminal
    /// receives the frozen decision; the group accepts no further writes.
    pub fn add_to_consensus(
        &self,
        task_id: &str,
        validation_id: Uuid,
        response: Response,
    ) -> ConsensusDecision {
        let group_handle = self.group_handle(task_id);
        let mut group = group_handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        group.add_member(validation_id, response);
        ConsensusDecision {
            group_id: group.id,
            status: group.status,
            agreement_level: group.agreement_level,
            consensus_result: group.consensus_result.clone(),
        }
    }

    /// Reads the current state of a task's group, if one exists.
    pub fn group_snapshot(&self, task_id: &str) -> Option<ConsensusGroup> {
        let groups = self
            .groups
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        groups.get(task_id).map(|handle| {
            handle
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        })
    }

    fn group_handle(&self, task_id: &str) -> Arc<Mutex<ConsensusGroup>> {
        {
            let groups = self
                .groups
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(handle) = groups.get(task_id) {
                return Arc::clone(handle);
            }
        }
        let mut groups = self
            .groups
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(groups.entry(task_id.to_owned()).or_insert_with(|| {
            Arc::new(Mutex::new(ConsensusGroup::new(
                task_id,
                self.required_validations,
                self.agreement_threshold,
            )))
        }))
    }
}
