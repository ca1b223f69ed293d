//! Matcher decision tests against a scripted oracle.

mod common;

use common::ScriptedOracle;
use sensei_core::error::Error;
use sensei_core::matcher::{CanonicalMatcher, MATCH_CONFIDENCE_THRESHOLD};
use sensei_core::model::{CanonicalId, MatchCandidate, MatchDecision, TaskProbe};

fn probe(name: &str) -> TaskProbe {
    TaskProbe {
        name: name.to_string(),
        description: None,
    }
}

fn candidate(name: &str) -> MatchCandidate {
    MatchCandidate {
        id: CanonicalId::new(),
        name: name.to_string(),
        description: None,
    }
}

// ---------------------------------------------------------------------------
// Short circuit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_candidates_skip_the_oracle() {
    let oracle = ScriptedOracle::verdict(true, Some(CanonicalId::new()), 0.99);
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &[])
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::NoMatch);
    assert_eq!(oracle.call_count(), 0);
}

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

#[tokio::test]
async fn confident_match_links_to_candidate() {
    let candidates = vec![candidate("Write blog draft")];
    let c1 = candidates[0].id;
    let oracle = ScriptedOracle::verdict(true, Some(c1), 0.82);
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::Existing(c1));
    assert_eq!(oracle.call_count(), 1);
}

#[tokio::test]
async fn threshold_is_inclusive() {
    let candidates = vec![candidate("Write blog draft")];
    let c1 = candidates[0].id;
    let oracle = ScriptedOracle::verdict(true, Some(c1), MATCH_CONFIDENCE_THRESHOLD);
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::Existing(c1));
}

#[tokio::test]
async fn below_threshold_is_no_match_even_when_found() {
    let candidates = vec![candidate("Write blog draft")];
    let oracle = ScriptedOracle::verdict(true, Some(candidates[0].id), 0.6);
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::NoMatch);
}

#[tokio::test]
async fn not_found_verdict_is_no_match_regardless_of_confidence() {
    let candidates = vec![candidate("Write blog draft")];
    let oracle = ScriptedOracle::verdict(false, None, 0.99);
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::NoMatch);
}

// ---------------------------------------------------------------------------
// Malformed verdicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn found_verdict_without_id_falls_back_to_exact_name() {
    let candidates = vec![candidate("Write blog draft")];
    let c1 = candidates[0].id;
    let oracle = ScriptedOracle::verdict(true, None, 0.9);
    let matcher = CanonicalMatcher::new(&oracle);

    // Exact (case-insensitive, trimmed) name still matches.
    let decision = matcher
        .resolve(&probe("  write BLOG draft "), "Marketing", &candidates)
        .await
        .unwrap();
    assert_eq!(decision, MatchDecision::Existing(c1));

    // Different name: nothing to fall back on.
    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();
    assert_eq!(decision, MatchDecision::NoMatch);
}

#[tokio::test]
async fn verdict_naming_unknown_candidate_falls_back() {
    let candidates = vec![candidate("Write blog draft")];
    let oracle = ScriptedOracle::verdict(true, Some(CanonicalId::new()), 0.95);
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::NoMatch);
}

// ---------------------------------------------------------------------------
// Oracle failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn call_failure_falls_back_to_exact_name() {
    let candidates = vec![candidate("Write blog draft")];
    let c1 = candidates[0].id;
    let oracle = ScriptedOracle::failing("timed out after 15s");
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("write blog draft"), "Marketing", &candidates)
        .await
        .unwrap();
    assert_eq!(decision, MatchDecision::Existing(c1));

    let decision = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await
        .unwrap();
    assert_eq!(decision, MatchDecision::NoMatch);
}

#[tokio::test]
async fn fallback_takes_first_exact_match_in_candidate_order() {
    let candidates = vec![candidate("Review PRs"), candidate("Review PRs")];
    let first = candidates[0].id;
    let oracle = ScriptedOracle::failing("boom");
    let matcher = CanonicalMatcher::new(&oracle);

    let decision = matcher
        .resolve(&probe("Review PRs"), "Engineering", &candidates)
        .await
        .unwrap();

    assert_eq!(decision, MatchDecision::Existing(first));
}

#[tokio::test]
async fn outage_propagates_to_the_caller() {
    let candidates = vec![candidate("Write blog draft")];
    let oracle = ScriptedOracle::unavailable("connection refused");
    let matcher = CanonicalMatcher::new(&oracle);

    let result = matcher
        .resolve(&probe("Write blog post"), "Marketing", &candidates)
        .await;

    assert!(matches!(result, Err(Error::OracleUnavailable(_))));
}
