//! Model invocation with per-model retry and a fallback chain.
//!
//! ## Policy
//!
//! Models are tried in chain order. On one model:
//!
//! - a parsed, schema-valid response is accepted, even if nearly empty;
//! - a truncated response moves straight to the next model (a retry would
//!   hit the same output limit);
//! - parse errors and transient errors are retried up to `max_attempts`
//!   times with exponential backoff (`backoff_base_ms * 2^(retry-1)`);
//! - an unavailable model is skipped without retries.
//!
//! The chunk fails only when every model has been exhausted.

use crate::client::{FinishReason, ModelClient, ModelRequest};
use crate::config::ExtractionConfig;
use crate::error::{ChunkError, ClientError, ExtractError};
use crate::pipeline::sanitize;
use crate::record::ExtractionRecord;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// A schema-valid record parsed from one model response.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult {
    pub record: ExtractionRecord,
    /// Model that produced the record.
    pub model: String,
    /// Total calls made for this chunk, across all models.
    pub attempts: u32,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Outcome of a single call. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(PartialResult),
    Truncated,
    ParseError(String),
    TransientError(String),
    /// The model cannot be called at all.
    Unavailable(String),
}

pub struct ModelInvoker {
    client: Arc<dyn ModelClient>,
    chain: Vec<String>,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl ModelInvoker {
    /// Build an invoker over `chain`.
    ///
    /// Blank entries and duplicates are dropped, keeping the first
    /// occurrence. An empty chain is a configuration error.
    pub fn new(
        client: Arc<dyn ModelClient>,
        chain: &[String],
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ExtractError> {
        let mut deduped: Vec<String> = Vec::with_capacity(chain.len());
        for model in chain.iter().map(|m| m.trim()) {
            if !model.is_empty() && !deduped.iter().any(|m| m == model) {
                deduped.push(model.to_string());
            }
        }
        if deduped.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Model chain is empty".into(),
            ));
        }
        Ok(Self {
            client,
            chain: deduped,
            max_attempts: max_attempts.max(1),
            backoff_base_ms,
        })
    }

    pub fn from_config(
        client: Arc<dyn ModelClient>,
        config: &ExtractionConfig,
    ) -> Result<Self, ExtractError> {
        Self::new(
            client,
            &config.models,
            config.max_attempts,
            config.retry_backoff_ms,
        )
    }

    /// The effective model chain.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Run `request` through the chain for chunk `chunk_number` (1-based).
    pub async fn invoke(
        &self,
        request: &ModelRequest,
        chunk_number: usize,
    ) -> Result<PartialResult, ChunkError> {
        let mut last_error = String::from("no attempt made");
        let mut calls = 0u32;

        for model in &self.chain {
            for attempt in 1..=self.max_attempts {
                if attempt > 1 {
                    let backoff = self.backoff_base_ms * 2u64.pow(attempt - 2);
                    warn!(
                        "Chunk {}: {} retry {}/{} after {}ms",
                        chunk_number,
                        model,
                        attempt - 1,
                        self.max_attempts - 1,
                        backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }

                calls += 1;
                match self.attempt(model, request).await {
                    AttemptOutcome::Success(mut partial) => {
                        partial.attempts = calls;
                        let populated = partial.record.populated_fields();
                        if populated <= 1 {
                            warn!(
                                "Chunk {}: {} returned a mostly empty result ({} fields)",
                                chunk_number, model, populated
                            );
                        }
                        info!(
                            "Chunk {}: extracted with {} ({} fields, attempt {})",
                            chunk_number, model, populated, attempt
                        );
                        return Ok(partial);
                    }
                    AttemptOutcome::Truncated => {
                        warn!(
                            "Chunk {}: {} output truncated, trying next model",
                            chunk_number, model
                        );
                        last_error = format!("{model}: response truncated at the output limit");
                        break;
                    }
                    AttemptOutcome::Unavailable(detail) => {
                        warn!("Chunk {}: {} unavailable: {}", chunk_number, model, detail);
                        last_error = format!("{model}: {detail}");
                        break;
                    }
                    AttemptOutcome::ParseError(detail) => {
                        warn!(
                            "Chunk {}: {} attempt {} returned invalid JSON: {}",
                            chunk_number, model, attempt, detail
                        );
                        last_error = format!("{model}: invalid JSON: {detail}");
                    }
                    AttemptOutcome::TransientError(detail) => {
                        warn!(
                            "Chunk {}: {} attempt {} failed: {}",
                            chunk_number, model, attempt, detail
                        );
                        last_error = format!("{model}: {detail}");
                    }
                }
            }
            debug!("Chunk {}: {} exhausted", chunk_number, model);
        }

        Err(ChunkError::AllModelsExhausted {
            chunk: chunk_number,
            models: self.chain.len(),
            last_error,
        })
    }

    /// One call against one model, classified.
    pub async fn attempt(&self, model: &str, request: &ModelRequest) -> AttemptOutcome {
        let response = match self.client.complete(model, request).await {
            Ok(r) => r,
            Err(ClientError::Transient(e)) => return AttemptOutcome::TransientError(e),
            Err(e @ ClientError::Unavailable { .. }) => {
                return AttemptOutcome::Unavailable(e.to_string())
            }
        };

        if response.finish == FinishReason::Truncated {
            return AttemptOutcome::Truncated;
        }

        match sanitize::parse_record(&response.text) {
            Ok(record) => AttemptOutcome::Success(PartialResult {
                record,
                model: model.to_string(),
                attempts: 1,
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
            }),
            Err(e) => AttemptOutcome::ParseError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ModelResponse;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays canned responses per model; an exhausted script is transient.
    #[derive(Default)]
    struct Scripted {
        script: Mutex<HashMap<String, VecDeque<Result<ModelResponse, ClientError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn push(&self, model: &str, r: Result<ModelResponse, ClientError>) {
            self.script
                .lock()
                .unwrap()
                .entry(model.to_string())
                .or_default()
                .push_back(r);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for Scripted {
        async fn complete(
            &self,
            model: &str,
            _request: &ModelRequest,
        ) -> Result<ModelResponse, ClientError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.script
                .lock()
                .unwrap()
                .get_mut(model)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| Err(ClientError::Transient("script exhausted".into())))
        }
    }

    fn truncated() -> Result<ModelResponse, ClientError> {
        Ok(ModelResponse {
            text: "{\"defendant\": {\"na".into(),
            finish: FinishReason::Truncated,
            input_tokens: 10,
            output_tokens: 100,
        })
    }

    fn ok(json: &str) -> Result<ModelResponse, ClientError> {
        Ok(ModelResponse::complete(json))
    }

    fn chain(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    fn invoker(client: &Arc<Scripted>, models: &[&str], attempts: u32) -> ModelInvoker {
        ModelInvoker::new(client.clone(), &chain(models), attempts, 1).unwrap()
    }

    #[test]
    fn empty_chain_is_a_config_error() {
        let client: Arc<dyn ModelClient> = Arc::new(Scripted::default());
        let err = ModelInvoker::new(client.clone(), &[], 3, 1).err().unwrap();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
        assert!(ModelInvoker::new(client, &chain(&["", "  "]), 3, 1).is_err());
    }

    #[test]
    fn chain_is_deduplicated_in_order() {
        let client: Arc<dyn ModelClient> = Arc::new(Scripted::default());
        let inv = ModelInvoker::new(client, &chain(&["b", "a", "b", " a ", "c"]), 3, 1).unwrap();
        assert_eq!(inv.chain(), &["b", "a", "c"]);
    }

    #[tokio::test]
    async fn truncation_then_parse_errors_then_success() {
        let client = Arc::new(Scripted::default());
        client.push("m1", truncated());
        for _ in 0..3 {
            client.push("m2", ok("not json at all"));
        }
        client.push("m3", ok(r#"{"court": {"court_name": "MA"}, "extraction_confidence": 0.5}"#));

        let result = invoker(&client, &["m1", "m2", "m3"], 3)
            .invoke(&ModelRequest::default(), 1)
            .await
            .unwrap();
        assert_eq!(result.model, "m3");
        assert_eq!(result.attempts, 5);
        assert_eq!(client.calls(), vec!["m1", "m2", "m2", "m2", "m3"]);
    }

    #[tokio::test]
    async fn truncation_is_never_retried_on_the_same_model() {
        let client = Arc::new(Scripted::default());
        client.push("m1", truncated());
        client.push("m1", ok("{}"));
        let err = invoker(&client, &["m1"], 3)
            .invoke(&ModelRequest::default(), 4)
            .await
            .unwrap_err();
        assert_eq!(client.calls(), vec!["m1"]);
        match err {
            ChunkError::AllModelsExhausted { chunk, models, last_error } => {
                assert_eq!(chunk, 4);
                assert_eq!(models, 1);
                assert!(last_error.contains("truncated"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried_then_succeed() {
        let client = Arc::new(Scripted::default());
        client.push("m1", Err(ClientError::Transient("503".into())));
        client.push("m1", ok(r#"{"verdict": {"result": "guilty"}}"#));
        let result = invoker(&client, &["m1"], 3)
            .invoke(&ModelRequest::default(), 1)
            .await
            .unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.model, "m1");
    }

    #[tokio::test]
    async fn unavailable_model_is_skipped_without_retry() {
        let client = Arc::new(Scripted::default());
        client.push(
            "m1",
            Err(ClientError::Unavailable {
                model: "m1".into(),
                detail: "no key".into(),
            }),
        );
        client.push("m2", ok("{}"));
        let result = invoker(&client, &["m1", "m2"], 3)
            .invoke(&ModelRequest::default(), 1)
            .await
            .unwrap();
        assert_eq!(result.model, "m2");
        assert_eq!(client.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn mostly_empty_result_is_still_success() {
        let client = Arc::new(Scripted::default());
        client.push("m1", ok("```json\n{}\n```"));
        let result = invoker(&client, &["m1"], 3)
            .invoke(&ModelRequest::default(), 1)
            .await
            .unwrap();
        assert!(result.record.is_empty());
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        let client = Arc::new(Scripted::default());
        let err = invoker(&client, &["m1", "m2"], 2)
            .invoke(&ModelRequest::default(), 2)
            .await
            .unwrap_err();
        assert_eq!(client.calls().len(), 4);
        assert!(err.to_string().contains("m2: script exhausted"));
    }
}
