//! Summary generation for a finished extraction.
//!
//! One model call per language with the record JSON in the prompt. The reply
//! is cleaned of code fences and invisible characters and trimmed.

use crate::client::{ModelClient, ModelRequest};
use crate::error::StageError;
use crate::pipeline::sanitize;
use crate::prompts::{self, SummaryLanguage};
use crate::record::ExtractionRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Indonesian primary summary and English secondary summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summaries {
    pub primary: String,
    pub secondary: String,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, record: &ExtractionRecord) -> Result<Summaries, StageError>;
}

/// [`Summarizer`] that asks a chat model for each language in turn.
pub struct LlmSummarizer {
    client: Arc<dyn ModelClient>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn ModelClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn one(&self, record_json: &str, language: SummaryLanguage) -> Result<String, StageError> {
        let request = ModelRequest {
            system: prompts::SUMMARY_SYSTEM_PROMPT.to_string(),
            prompt: prompts::summary_prompt(record_json, language),
            attachments: Vec::new(),
        };
        let response = self
            .client
            .complete(&self.model, &request)
            .await
            .map_err(|e| StageError::Summary(format!("{language:?}: {e}")))?;

        let text = sanitize::clean_text(&response.text);
        if text.is_empty() {
            return Err(StageError::Summary(format!(
                "{language:?}: model returned an empty summary"
            )));
        }
        debug!("{:?} summary: {} chars", language, text.chars().count());
        Ok(text)
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, record: &ExtractionRecord) -> Result<Summaries, StageError> {
        let record_json = serde_json::to_string_pretty(record)
            .map_err(|e| StageError::Summary(e.to_string()))?;

        let primary = self.one(&record_json, SummaryLanguage::Indonesian).await?;
        let secondary = self.one(&record_json, SummaryLanguage::English).await?;
        info!("Summaries generated with {}", self.model);

        Ok(Summaries { primary, secondary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ModelResponse;
    use crate::error::ClientError;
    use std::sync::Mutex;

    struct Echo {
        prompts: Mutex<Vec<String>>,
        reply: Result<&'static str, ClientError>,
    }

    #[async_trait]
    impl ModelClient for Echo {
        async fn complete(
            &self,
            _model: &str,
            request: &ModelRequest,
        ) -> Result<ModelResponse, ClientError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.reply.clone().map(ModelResponse::complete)
        }
    }

    fn record() -> ExtractionRecord {
        serde_json::from_str(r#"{"defendant": {"name": "Budi"}}"#).unwrap()
    }

    #[tokio::test]
    async fn asks_once_per_language_and_cleans_reply() {
        let client = Arc::new(Echo {
            prompts: Mutex::new(Vec::new()),
            reply: Ok("```\n  Terdakwa Budi dinyatakan bersalah.  \n```"),
        });
        let summarizer = LlmSummarizer::new(client.clone(), "m1");
        let s = summarizer.summarize(&record()).await.unwrap();
        assert_eq!(s.primary, "Terdakwa Budi dinyatakan bersalah.");
        assert_eq!(s.secondary, s.primary);

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Bahasa Indonesia"));
        assert!(prompts[1].contains("in English"));
        assert!(prompts[0].contains("Budi"));
    }

    #[tokio::test]
    async fn empty_reply_is_a_stage_error() {
        let client = Arc::new(Echo {
            prompts: Mutex::new(Vec::new()),
            reply: Ok("   "),
        });
        let err = LlmSummarizer::new(client, "m1")
            .summarize(&record())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Summary(_)));
    }

    #[tokio::test]
    async fn client_error_is_a_stage_error() {
        let client = Arc::new(Echo {
            prompts: Mutex::new(Vec::new()),
            reply: Err(ClientError::Transient("503".into())),
        });
        let err = LlmSummarizer::new(client, "m1")
            .summarize(&record())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
