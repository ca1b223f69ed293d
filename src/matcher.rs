//! Canonical matcher.
//!
//! Decides whether a newly logged task is a repeat occurrence of an existing
//! canonical task in its (domain, version) scope. Pure decision logic over an
//! injected oracle: no store access, no writes.

use crate::error::{Error, Result};
use crate::model::{MatchCandidate, MatchDecision, MatchResult, TaskProbe};
use crate::oracle::SimilarityOracle;

/// An oracle verdict is authoritative only at or above this confidence.
/// Everything below is treated as no-match, even when the oracle says
/// `matchFound`.
pub const MATCH_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// Matches new tasks against existing canonical candidates.
pub struct CanonicalMatcher<'a> {
    oracle: &'a dyn SimilarityOracle,
}

impl<'a> CanonicalMatcher<'a> {
    pub fn new(oracle: &'a dyn SimilarityOracle) -> Self {
        Self { oracle }
    }

    /// Resolve a new task against the candidate list.
    ///
    /// An empty candidate list short-circuits to no-match without consulting
    /// the oracle: the first occurrence in a scope always gets a fresh
    /// canonical task. Otherwise the oracle is asked once, over the whole
    /// list. Call-level oracle failures (timeout, garbage, error payload)
    /// degrade to an exact trimmed case-insensitive name comparison and never
    /// propagate.
    ///
    /// # Errors
    /// Only [`Error::OracleUnavailable`] escapes — the signal that the
    /// oracle's hosting layer is down entirely, which the orchestrator
    /// handles with its own degraded path.
    pub async fn resolve(
        &self,
        probe: &TaskProbe,
        domain_name: &str,
        candidates: &[MatchCandidate],
    ) -> Result<MatchDecision> {
        if candidates.is_empty() {
            tracing::debug!(task = %probe.name, "no candidates in scope, skipping oracle");
            return Ok(MatchDecision::NoMatch);
        }

        match self.oracle.judge(probe, domain_name, candidates).await {
            Ok(result) => Ok(Self::decide(probe, candidates, result)),
            Err(Error::OracleUnavailable(e)) => Err(Error::OracleUnavailable(e)),
            Err(e) => {
                tracing::warn!(task = %probe.name, error = %e, "oracle failed, using exact-name fallback");
                Ok(exact_name_fallback(probe, candidates))
            }
        }
    }

    fn decide(
        probe: &TaskProbe,
        candidates: &[MatchCandidate],
        result: MatchResult,
    ) -> MatchDecision {
        if !result.match_found || result.confidence < MATCH_CONFIDENCE_THRESHOLD {
            tracing::debug!(
                task = %probe.name,
                confidence = result.confidence,
                "below threshold, treating as new activity"
            );
            return MatchDecision::NoMatch;
        }

        // A positive verdict must name one of the candidates. A missing or
        // unknown id is a malformed verdict, handled like any other bad
        // response.
        match result.matched_canonical_task_id {
            Some(id) if candidates.iter().any(|c| c.id == id) => {
                tracing::debug!(
                    task = %probe.name,
                    canonical = %id,
                    confidence = result.confidence,
                    reasoning = result.reasoning.as_deref().unwrap_or(""),
                    "matched existing canonical task"
                );
                MatchDecision::Existing(id)
            }
            _ => {
                tracing::warn!(
                    task = %probe.name,
                    "verdict named no known candidate, using exact-name fallback"
                );
                exact_name_fallback(probe, candidates)
            }
        }
    }
}

/// Exact, case-insensitive, whitespace-trimmed name comparison. First match
/// in candidate order wins.
fn exact_name_fallback(probe: &TaskProbe, candidates: &[MatchCandidate]) -> MatchDecision {
    let needle = probe.name.trim().to_lowercase();
    candidates
        .iter()
        .find(|c| c.name.trim().to_lowercase() == needle)
        .map(|c| MatchDecision::Existing(c.id))
        .unwrap_or(MatchDecision::NoMatch)
}
