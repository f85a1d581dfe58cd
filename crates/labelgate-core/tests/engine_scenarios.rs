//! End-to-end scenarios through the public engine API: golden-backed
//! validation, bot-suspect submissions, and consensus group resolution.

use labelgate_core::{
    ConsensusStatus, GoldenExample, IssueKind, QaConfig, QaEngine, Response, TaskType,
    ValidationRequest, ValidationStatus,
};
use uuid::Uuid;

fn vqa_request(task_id: &str, response: Response, elapsed_ms: i64) -> ValidationRequest {
    ValidationRequest::new(
        task_id,
        "session-1",
        "publisher-1",
        TaskType::Vqa,
        response,
        elapsed_ms,
    )
}

#[test]
fn golden_backed_record_submission_is_validated() {
    // Expected {"class": "dog"} with a 0.1 tolerance; the candidate matches
    // exactly, so the golden strategy contributes quality 1.0 at full
    // confidence and the fused verdict validates.
    let engine = QaEngine::new(QaConfig::default());
    let golden = GoldenExample::new(
        "task-1",
        Response::record([("class", Response::text("dog"))]),
        0.1,
        Vec::new(),
        "animals",
    )
    .unwrap();

    let validation = engine.validate(
        vqa_request(
            "task-1",
            Response::record([("class", Response::text("dog"))]),
            2_500,
        )
        .with_golden(golden),
    );

    assert_eq!(validation.status, ValidationStatus::Validated);
    assert!(validation.quality_score >= 0.7);
    assert!(validation.confidence >= 0.85);
    assert!(validation.consensus_group.is_none());

    let perf = engine.golden_performance("task-1").unwrap();
    assert_eq!(perf.evaluations, 1);
    assert_eq!(perf.pass_rate(), 1.0);
}

#[test]
fn instant_submission_without_golden_never_validates() {
    // 50ms on a vqa task is far below every minimum; bot detection flags it
    // and the fused quality stays low.
    let engine = QaEngine::new(QaConfig::default());
    let validation = engine.validate(vqa_request("task-1", Response::text("dog"), 50));

    assert_ne!(validation.status, ValidationStatus::Validated);
    assert!(validation.quality_score < 0.6);
    assert!(validation
        .issues
        .iter()
        .any(|issue| issue.kind == IssueKind::SuspiciouslyFastResponse));
    assert!(validation
        .issues
        .iter()
        .any(|issue| issue.kind == IssueKind::InsufficientTime));
}

#[test]
fn unanimous_group_completes_at_full_agreement() {
    let engine = QaEngine::new(QaConfig::new(0.85, 0.60, 3, 0.75, 0.10).unwrap());
    engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("dog"));
    engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("dog"));
    let decision = engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("dog"));

    assert_eq!(decision.status, ConsensusStatus::Completed);
    assert_eq!(decision.agreement_level, 1.0);
    assert!(decision
        .consensus_result
        .unwrap()
        .matches(&Response::text("dog")));
}

#[test]
fn split_group_fails_at_the_member_budget() {
    // required=2, threshold=0.9: two "a"/"b" camps give 2 matching pairs of
    // 6 and the group reaches the 2x member budget without agreement.
    let engine = QaEngine::new(QaConfig::new(0.85, 0.60, 2, 0.9, 0.10).unwrap());
    for text in ["a", "b", "a"] {
        let decision = engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text(text));
        assert!(!matches!(
            decision.status,
            ConsensusStatus::Completed | ConsensusStatus::Failed
        ));
    }
    let decision = engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("b"));

    assert_eq!(decision.status, ConsensusStatus::Failed);
    assert!((decision.agreement_level - 2.0 / 6.0).abs() < 1e-9);
    assert!(decision.consensus_result.is_none());
}

#[test]
fn terminal_group_gives_late_arrivals_the_frozen_decision() {
    let engine = QaEngine::new(QaConfig::new(0.85, 0.60, 2, 0.5, 0.10).unwrap());
    engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("dog"));
    let completed = engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("dog"));
    assert_eq!(completed.status, ConsensusStatus::Completed);

    let late = engine.add_to_consensus("task-1", Uuid::new_v4(), Response::text("cat"));
    assert_eq!(late.status, ConsensusStatus::Completed);
    assert_eq!(late.group_id, completed.group_id);
    assert_eq!(late.agreement_level, completed.agreement_level);
    assert_eq!(late.consensus_result, completed.consensus_result);
}

#[test]
fn review_pipeline_resolves_a_task_end_to_end() {
    // Without a golden example or baseline, confidence stays below HIGH, so
    // each submission lands in review; agreeing submissions then close the
    // group through consensus.
    let engine = QaEngine::new(QaConfig::new(0.85, 0.60, 2, 0.75, 0.10).unwrap());

    let first = engine.validate(vqa_request("task-9", Response::text("cat"), 2_500));
    assert_eq!(first.status, ValidationStatus::NeedsReview);
    let group_id = first.consensus_group.unwrap();

    let second = engine.validate(vqa_request("task-9", Response::text(" CAT "), 2_700));
    assert_eq!(second.consensus_group, Some(group_id));

    let decision = engine.add_to_consensus("task-9", Uuid::new_v4(), Response::text("cat"));
    assert_eq!(decision.status, ConsensusStatus::Completed);
    assert!(decision
        .consensus_result
        .unwrap()
        .matches(&Response::text("cat")));
}

#[test]
fn mixed_shapes_always_produce_a_bounded_verdict() {
    let engine = QaEngine::new(QaConfig::default());
    let responses = [
        Response::from(true),
        Response::from(42.0),
        Response::text("a long free form answer about the picture"),
        Response::Sequence(vec![Response::text("dog"), Response::text("cat")]),
        Response::record([("label", Response::text("dog")), ("score", Response::from(0.9))]),
    ];
    for (index, response) in responses.into_iter().enumerate() {
        let validation =
            engine.validate(vqa_request(&format!("task-{index}"), response, 2_500));
        assert!((0.0..=1.0).contains(&validation.quality_score));
        assert!((0.0..=1.0).contains(&validation.confidence));
    }
}
