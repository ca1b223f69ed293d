//! Similarity oracle abstraction.
//!
//! The oracle judges whether a new task is a repeat occurrence of one of the
//! existing canonical tasks in its scope. It is realized over a generic
//! text-generation contract: a prompt plus system instruction goes out, text
//! comes back, and the text must parse as a [`MatchResult`]. Everything else
//! about the backing service is an implementation detail of the client.

pub mod gemini;

pub use gemini::GeminiOracle;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{MatchCandidate, MatchResult, TaskProbe};

/// System instruction sent with every comparison request. The confidence
/// bands are advisory context for the model; only the matcher's threshold is
/// load-bearing.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a task similarity analyzer. Determine if a new task matches any existing canonical tasks.

Return JSON with this structure:
{
  \"matchFound\": true/false,
  \"matchedCanonicalTaskId\": \"uuid or null\",
  \"confidence\": 0.0-1.0,
  \"reasoning\": \"Brief explanation\"
}

Confidence scale:
- 0.9-1.0: Very high (same activity, different wording)
- 0.75-0.89: High (similar activity)
- 0.5-0.74: Medium (related but different)
- 0.0-0.49: Low (different activities)";

/// Sampling temperature for comparison requests. Low: we want literal,
/// deterministic verdicts, not creative ones.
pub const TEMPERATURE: f64 = 0.2;

/// Output-token cap for comparison requests. The verdict is a small JSON
/// object; anything longer is waste.
pub const MAX_OUTPUT_TOKENS: u64 = 300;

/// External judgment service for near-duplicate task names.
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    /// One combined comparison: the new task against the whole candidate
    /// list. Exactly one external call per invocation.
    ///
    /// # Errors
    /// [`Error::Oracle`] for call-level failures (timeout, transport error,
    /// error payload, unparseable response); [`Error::OracleUnavailable`]
    /// when the hosting layer cannot be reached at all.
    async fn judge(
        &self,
        probe: &TaskProbe,
        domain_name: &str,
        candidates: &[MatchCandidate],
    ) -> Result<MatchResult>;
}

/// A text-generation request: the shape every oracle backend consumes.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u64,
}

/// Normalized text-generation response. Transport-level failures and
/// structured error payloads both land in `error` so upstream code handles
/// one shape.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub error: Option<String>,
}

/// Build the comparison prompt: the new task's fields, its domain for
/// context, and the candidate list enumerated with ids so the verdict can
/// name the matched canonical task.
pub fn build_prompt(probe: &TaskProbe, domain_name: &str, candidates: &[MatchCandidate]) -> String {
    let candidate_list = candidates
        .iter()
        .map(|c| {
            format!(
                "- [{}] {}: {}",
                c.id,
                c.name,
                c.description.as_deref().unwrap_or("No description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "New Task:\n\
         Name: {}\n\
         Description: {}\n\
         Domain: {}\n\
         \n\
         Existing Canonical Tasks in this domain:\n\
         {}\n\
         \n\
         Determine if the new task matches any existing canonical task.",
        probe.name,
        probe.description.as_deref().unwrap_or("No description"),
        domain_name,
        candidate_list
    )
}

/// Parse oracle response text as a match verdict. The text is opaque until it
/// parses; anything else is a call-level oracle error.
pub fn parse_match_result(text: &str) -> Result<MatchResult> {
    serde_json::from_str(text)
        .map_err(|e| Error::Oracle(format!("unparseable oracle response: {e}")))
}
