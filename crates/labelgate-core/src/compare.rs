//! Structural similarity between response values.
//!
//! The comparator is a total function: every pair of values of any supported
//! shape yields a score in `[0, 1]`, never an error. Dispatch follows the
//! *expected* value's shape, so a golden example decides which comparison
//! semantics apply, and shape mismatches degrade to a zero score with a
//! type-mismatch issue.
//!
//! The text heuristics are deliberately simple (exact match for short
//! strings, keyword coverage for long ones); the contract here is the
//! decision policy built on top of these scores, not NLP-grade similarity.

use crate::issue::{Issue, IssueKind};
use crate::response::{normalize_text, Response};

/// Expected text at or below this length compares by exact normalized match.
const SHORT_TEXT_MAX_LEN: usize = 20;

/// Expected tokens must be longer than this to count as keywords.
const KEYWORD_MIN_LEN: usize = 3;

/// Weight of key coverage in record similarity.
const RECORD_COVERAGE_WEIGHT: f64 = 0.4;

/// Weight of per-key value similarity in record similarity.
const RECORD_VALUE_WEIGHT: f64 = 0.6;

/// Common English function words excluded from keyword coverage.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "been", "before", "being",
    "between", "both", "does", "down", "each", "from", "have", "here", "into",
    "just", "more", "most", "only", "other", "over", "same", "some", "than",
    "that", "them", "then", "there", "these", "they", "this", "under", "very",
    "were", "what", "when", "where", "which", "while", "will", "with", "your",
];

/// Result of one structural comparison: a bounded score plus any findings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comparison {
    /// Similarity in `[0, 1]`; 1.0 means an exact match.
    pub score: f64,
    /// Findings explaining why the score is below 1.0.
    pub issues: Vec<Issue>,
}

impl Comparison {
    fn exact() -> Self {
        Self {
            score: 1.0,
            issues: Vec::new(),
        }
    }

    fn scored(score: f64) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            issues: Vec::new(),
        }
    }

    fn with_issue(score: f64, issue: Issue) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            issues: vec![issue],
        }
    }
}

/// Compares a candidate response against an expected one.
///
/// Returns the similarity score together with the issues that explain any
/// shortfall. Callers that only need the number can use [`similarity`].
#[must_use]
pub fn compare(expected: &Response, candidate: &Response) -> Comparison {
    match (expected, candidate) {
        (Response::Bool(e), Response::Bool(c)) => compare_bool(*e, *c),
        (Response::Number(e), Response::Number(c)) => compare_number(*e, *c),
        (Response::Text(e), Response::Text(c)) => compare_text(e, c),
        (Response::Sequence(e), Response::Sequence(c)) => compare_sequence(e, c),
        (Response::Record(e), Response::Record(c)) => compare_record(e, c),
        (expected, candidate) => Comparison::with_issue(
            0.0,
            Issue::new(
                IssueKind::TypeMismatch,
                format!(
                    "expected a {} response, got {}",
                    expected.kind(),
                    candidate.kind()
                ),
            ),
        ),
    }
}

/// Similarity score alone, discarding issue detail.
#[must_use]
pub fn similarity(expected: &Response, candidate: &Response) -> f64 {
    compare(expected, candidate).score
}

fn compare_bool(expected: bool, candidate: bool) -> Comparison {
    if expected == candidate {
        Comparison::exact()
    } else {
        Comparison::with_issue(
            0.0,
            Issue::new(
                IssueKind::ValueMismatch,
                format!("expected {expected}, got {candidate}"),
            ),
        )
    }
}

fn compare_number(expected: f64, candidate: f64) -> Comparison {
    if expected == candidate {
        return Comparison::exact();
    }
    let magnitude = expected.abs().max(candidate.abs());
    if magnitude == 0.0 {
        // Unequal but both zero-magnitude (e.g. 0.0 vs -0.0 falls under
        // equality above); nothing left to scale by.
        return Comparison::exact();
    }
    let score = (1.0 - (expected - candidate).abs() / magnitude).max(0.0);
    if score < 1.0 {
        Comparison::with_issue(
            score,
            Issue::new(
                IssueKind::ValueMismatch,
                format!("expected {expected}, got {candidate}"),
            )
            .with_score_impact(1.0 - score),
        )
    } else {
        Comparison::scored(score)
    }
}

fn compare_text(expected: &str, candidate: &str) -> Comparison {
    let expected_norm = normalize_text(expected);
    let candidate_norm = normalize_text(candidate);

    if expected_norm.len() <= SHORT_TEXT_MAX_LEN {
        return if expected_norm == candidate_norm {
            Comparison::exact()
        } else {
            Comparison::with_issue(
                0.0,
                Issue::new(
                    IssueKind::ValueMismatch,
                    format!("expected \"{expected_norm}\", got \"{candidate_norm}\""),
                ),
            )
        };
    }

    // Long expected text: fraction of expected keywords found as substrings
    // of the candidate.
    let keywords: Vec<&str> = expected_norm
        .split_whitespace()
        .filter(|token| token.len() > KEYWORD_MIN_LEN && !STOPWORDS.contains(token))
        .collect();
    if keywords.is_empty() {
        return Comparison::exact();
    }
    let found = keywords
        .iter()
        .filter(|keyword| candidate_norm.contains(*keyword))
        .count();
    let score = found as f64 / keywords.len() as f64;
    if score < 1.0 {
        Comparison::with_issue(
            score,
            Issue::new(
                IssueKind::PartialMatch,
                format!(
                    "candidate covers {found} of {} expected keywords",
                    keywords.len()
                ),
            )
            .with_score_impact(1.0 - score),
        )
    } else {
        Comparison::scored(score)
    }
}

fn compare_sequence(expected: &[Response], candidate: &[Response]) -> Comparison {
    if expected.is_empty() && candidate.is_empty() {
        return Comparison::exact();
    }
    if expected.is_empty() || candidate.is_empty() {
        return Comparison::with_issue(
            0.0,
            Issue::new(
                IssueKind::PartialMatch,
                "one of the sequences is empty".to_owned(),
            ),
        );
    }
    if expected.iter().all(Response::is_scalar) && candidate.iter().all(Response::is_scalar) {
        compare_scalar_sets(expected, candidate)
    } else {
        compare_aligned(expected, candidate)
    }
}

/// F1-style set comparison for sequences of scalars (order-insensitive).
fn compare_scalar_sets(expected: &[Response], candidate: &[Response]) -> Comparison {
    use std::collections::BTreeSet;

    let expected_keys: BTreeSet<String> =
        expected.iter().map(Response::canonical_key).collect();
    let candidate_keys: BTreeSet<String> =
        candidate.iter().map(Response::canonical_key).collect();

    let common = expected_keys.intersection(&candidate_keys).count();
    let recall = common as f64 / expected_keys.len() as f64;
    let precision = common as f64 / candidate_keys.len() as f64;
    let score = if recall + precision == 0.0 {
        0.0
    } else {
        2.0 * recall * precision / (recall + precision)
    };

    let mut issues = Vec::new();
    let missing: Vec<&String> = expected_keys.difference(&candidate_keys).collect();
    if !missing.is_empty() {
        issues.push(Issue::new(
            IssueKind::MissingItems,
            format!(
                "expected items not present: {}",
                missing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }
    let unexpected: Vec<&String> = candidate_keys.difference(&expected_keys).collect();
    if !unexpected.is_empty() {
        issues.push(Issue::new(
            IssueKind::UnexpectedItems,
            format!(
                "unexpected items present: {}",
                unexpected
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }

    Comparison {
        score: score.clamp(0.0, 1.0),
        issues,
    }
}

/// Index-aligned recursive comparison for sequences with structured elements.
///
/// Averages over `len(expected)`, not `len(candidate)`, so missing trailing
/// elements are explicitly penalized.
fn compare_aligned(expected: &[Response], candidate: &[Response]) -> Comparison {
    let mut total = 0.0;
    let mut issues = Vec::new();
    for (index, expected_item) in expected.iter().enumerate() {
        match candidate.get(index) {
            Some(candidate_item) => {
                let inner = compare(expected_item, candidate_item);
                total += inner.score;
                issues.extend(inner.issues);
            },
            None => {
                issues.push(Issue::new(
                    IssueKind::MissingItems,
                    format!("missing sequence element at index {index}"),
                ));
            },
        }
    }
    Comparison {
        score: (total / expected.len() as f64).clamp(0.0, 1.0),
        issues,
    }
}

/// Keyed record comparison: weighted blend of key coverage and per-shared-key
/// value similarity.
///
/// Missing keys lower the coverage term but are *excluded* from the value
/// term rather than zero-filled; the asymmetry keeps a record that answers a
/// subset of keys correctly distinguishable from one that answers every key
/// badly.
fn compare_record(
    expected_map: &std::collections::BTreeMap<String, Response>,
    candidate_map: &std::collections::BTreeMap<String, Response>,
) -> Comparison {
    if expected_map.is_empty() && candidate_map.is_empty() {
        return Comparison::exact();
    }
    if expected_map.is_empty() || candidate_map.is_empty() {
        return Comparison::with_issue(
            0.0,
            Issue::new(
                IssueKind::PartialMatch,
                "one of the records is empty".to_owned(),
            ),
        );
    }

    let mut issues = Vec::new();
    let missing: Vec<&str> = expected_map
        .keys()
        .filter(|key| !candidate_map.contains_key(*key))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        issues.push(Issue::new(
            IssueKind::MissingKeys,
            format!("missing expected keys: {}", missing.join(", ")),
        ));
    }

    let shared = expected_map.len() - missing.len();
    let key_coverage = shared as f64 / expected_map.len() as f64;
    let value_similarity = if shared == 0 {
        0.0
    } else {
        let mut total = 0.0;
        for (key, expected_value) in expected_map {
            if let Some(candidate_value) = candidate_map.get(key) {
                let inner = compare(expected_value, candidate_value);
                total += inner.score;
                issues.extend(inner.issues);
            }
        }
        total / shared as f64
    };

    let score = RECORD_COVERAGE_WEIGHT * key_coverage + RECORD_VALUE_WEIGHT * value_similarity;
    Comparison {
        score: score.clamp(0.0, 1.0),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn seq(items: &[&str]) -> Response {
        Response::Sequence(items.iter().map(|s| Response::text(*s)).collect())
    }

    // =========================================================================
    // Scalar comparison
    // =========================================================================

    #[test]
    fn equal_numbers_match_exactly() {
        assert_eq!(similarity(&Response::from(42.0), &Response::from(42.0)), 1.0);
    }

    #[test]
    fn number_similarity_scales_with_relative_difference() {
        let score = similarity(&Response::from(100.0), &Response::from(90.0));
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn opposite_sign_numbers_floor_at_zero() {
        assert_eq!(similarity(&Response::from(1.0), &Response::from(-100.0)), 0.0);
    }

    #[test]
    fn bool_mismatch_scores_zero_with_issue() {
        let result = compare(&Response::Bool(true), &Response::Bool(false));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.issues[0].kind, IssueKind::ValueMismatch);
    }

    #[test]
    fn shape_mismatch_scores_zero_with_type_issue() {
        let result = compare(&Response::from(1.0), &Response::text("one"));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.issues[0].kind, IssueKind::TypeMismatch);
    }

    // =========================================================================
    // Text comparison
    // =========================================================================

    #[test]
    fn short_text_matches_case_insensitively() {
        assert_eq!(
            similarity(&Response::text("Dog"), &Response::text("  dog ")),
            1.0
        );
    }

    #[test]
    fn short_text_mismatch_is_zero() {
        assert_eq!(similarity(&Response::text("dog"), &Response::text("cat")), 0.0);
    }

    #[test]
    fn long_text_uses_keyword_coverage() {
        let expected = Response::text("a golden retriever playing fetch in the park");
        let candidate = Response::text("the golden retriever is playing in a park");
        // Keywords: golden, retriever, playing, fetch, park (all len > 3,
        // non-stopword). Candidate covers all but "fetch".
        let score = similarity(&expected, &candidate);
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn long_text_without_keywords_is_full_match() {
        let expected = Response::text("a to of in is at on it be as or we an");
        let score = similarity(&expected, &Response::text("anything"));
        assert_eq!(score, 1.0);
    }

    // =========================================================================
    // Sequence comparison
    // =========================================================================

    #[test]
    fn identical_scalar_sequences_match() {
        assert_eq!(similarity(&seq(&["a", "b"]), &seq(&["b", "a"])), 1.0);
    }

    #[test]
    fn scalar_sequences_score_f1() {
        // expected {a,b}, candidate {b,c}: common 1, recall 0.5,
        // precision 0.5, F1 0.5.
        let result = compare(&seq(&["a", "b"]), &seq(&["b", "c"]));
        assert!((result.score - 0.5).abs() < 1e-9);
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::MissingItems));
        assert!(result
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::UnexpectedItems));
    }

    #[test]
    fn disjoint_scalar_sequences_score_zero() {
        assert_eq!(similarity(&seq(&["a"]), &seq(&["b"])), 0.0);
    }

    #[test]
    fn structured_sequences_penalize_missing_trailing_elements() {
        let item = |label: &str| Response::record([("label", Response::text(label))]);
        let expected = Response::Sequence(vec![item("a"), item("b")]);
        let candidate = Response::Sequence(vec![item("a")]);
        let result = compare(&expected, &candidate);
        assert!((result.score - 0.5).abs() < 1e-9);
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::MissingItems));
    }

    // =========================================================================
    // Record comparison
    // =========================================================================

    #[test]
    fn identical_records_match() {
        let record = Response::record([("class", Response::text("dog"))]);
        assert_eq!(similarity(&record, &record.clone()), 1.0);
    }

    #[test]
    fn missing_key_lowers_coverage_only() {
        let expected = Response::record([
            ("class", Response::text("dog")),
            ("breed", Response::text("husky")),
        ]);
        let candidate = Response::record([("class", Response::text("dog"))]);
        // coverage 0.5, value similarity over the shared key 1.0:
        // 0.4*0.5 + 0.6*1.0 = 0.8.
        let result = compare(&expected, &candidate);
        assert!((result.score - 0.8).abs() < 1e-9);
        assert_eq!(result.issues[0].kind, IssueKind::MissingKeys);
    }

    #[test]
    fn no_shared_keys_scores_zero() {
        let expected = Response::record([("class", Response::text("dog"))]);
        let candidate = Response::record([("label", Response::text("dog"))]);
        assert_eq!(similarity(&expected, &candidate), 0.0);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn arb_response() -> impl Strategy<Value = Response> {
        let scalar = prop_oneof![
            any::<bool>().prop_map(Response::Bool),
            (-1.0e6f64..1.0e6).prop_map(Response::Number),
            "[a-z ]{0,30}".prop_map(Response::Text),
        ];
        scalar.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Response::Sequence),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(Response::Record),
            ]
        })
    }

    proptest! {
        /// Property: similarity is bounded to [0, 1] for every shape pair.
        #[test]
        fn prop_similarity_bounded(a in arb_response(), b in arb_response()) {
            let score = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        /// Property: every value is fully similar to itself.
        #[test]
        fn prop_similarity_reflexive(a in arb_response()) {
            prop_assert!((similarity(&a, &a) - 1.0).abs() < 1e-9);
        }
    }
}
