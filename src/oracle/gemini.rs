//! Gemini-backed similarity oracle via rig-core.
//!
//! One short completion per judgment, low temperature, bounded by a timeout.
//! A timeout is treated identically to a transport failure: normalized into
//! the response's `error` field and surfaced as a call-level oracle error.

use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;

use super::{
    GenerationRequest, GenerationResponse, MAX_OUTPUT_TOKENS, SYSTEM_INSTRUCTION,
    SimilarityOracle, TEMPERATURE, build_prompt, parse_match_result,
};
use crate::error::{Error, Result};
use crate::model::{MatchCandidate, MatchResult, TaskProbe};
use crate::telemetry::{genai, metrics};
use opentelemetry::KeyValue;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Similarity oracle backed by a Gemini completion model.
pub struct GeminiOracle {
    client: rig::providers::gemini::Client,
    model: String,
    timeout: Duration,
}

impl GeminiOracle {
    /// Create an oracle from a secret API key and model name.
    ///
    /// # Errors
    /// [`Error::OracleUnavailable`] if the underlying HTTP client cannot be
    /// constructed — the hosting layer is unusable, not a single bad call.
    pub fn new(api_key: &SecretString, model: impl Into<String>) -> Result<Self> {
        let client = rig::providers::gemini::Client::new(api_key.expose_secret())
            .map_err(|e| Error::OracleUnavailable(format!("cannot build Gemini client: {e}")))?;
        Ok(Self {
            client,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Single-shot text generation. Never returns an error: transport
    /// failures, error payloads, and timeouts all normalize into
    /// [`GenerationResponse::error`].
    async fn generate(&self, request: GenerationRequest) -> GenerationResponse {
        let mut builder = self
            .client
            .agent(&self.model)
            .temperature(request.temperature)
            .max_tokens(request.max_output_tokens);
        if let Some(ref system) = request.system {
            builder = builder.preamble(system);
        }
        let agent = builder.build();

        let span = genai::start_chat_span(&self.model, "gemini");
        let outcome = tokio::time::timeout(self.timeout, agent.prompt(request.prompt))
            .instrument(span)
            .await;

        match outcome {
            Ok(Ok(text)) => GenerationResponse { text, error: None },
            Ok(Err(e)) => GenerationResponse {
                text: String::new(),
                error: Some(format!("completion failed: {e}")),
            },
            Err(_) => GenerationResponse {
                text: String::new(),
                error: Some(format!("timed out after {:?}", self.timeout)),
            },
        }
    }
}

#[async_trait]
impl SimilarityOracle for GeminiOracle {
    async fn judge(
        &self,
        probe: &TaskProbe,
        domain_name: &str,
        candidates: &[MatchCandidate],
    ) -> Result<MatchResult> {
        let request = GenerationRequest {
            prompt: build_prompt(probe, domain_name, candidates),
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = self.generate(request).await;

        if let Some(error) = response.error {
            metrics::oracle_calls().add(
                1,
                &[
                    KeyValue::new("model", self.model.clone()),
                    KeyValue::new("result", "error"),
                ],
            );
            tracing::warn!(model = %self.model, error = %error, "oracle call failed");
            return Err(Error::Oracle(error));
        }

        let result = parse_match_result(&response.text)?;
        metrics::oracle_calls().add(
            1,
            &[
                KeyValue::new("model", self.model.clone()),
                KeyValue::new("result", "ok"),
            ],
        );
        Ok(result)
    }
}
