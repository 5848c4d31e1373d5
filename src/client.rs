//! The model-call boundary.
//!
//! [`ModelClient`] is the one seam through which the pipeline talks to an
//! LLM: a system prompt, a user prompt, and optional attachments go in; text
//! and a finish condition come out. [`LlmModelClient`] implements it on top
//! of edgequake-llm providers; tests substitute scripted clients.

use crate::config::ExtractionConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Base64 payload attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// e.g. `application/pdf` or `image/png`.
    pub mime_type: String,
    /// Standard base64, no data-URI prefix.
    pub data: String,
}

#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub system: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    /// Output hit the token limit; the text is cut off mid-document.
    Truncated,
    Other(String),
}

impl FinishReason {
    /// Map a provider's raw finish reason.
    ///
    /// `"length"` (OpenAI-style) and `"max_tokens"` (Gemini / Anthropic) mean
    /// truncation; a missing reason is treated as a normal stop.
    pub fn from_provider(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()) {
            None => FinishReason::Complete,
            Some(r) if r.is_empty() || r == "stop" || r == "end_turn" => FinishReason::Complete,
            Some(r) if r == "length" || r == "max_tokens" => FinishReason::Truncated,
            Some(r) => FinishReason::Other(r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    pub finish: FinishReason,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ModelResponse {
    /// A complete response with no token accounting.
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish: FinishReason::Complete,
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// One chat-completion call against a named model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<ModelResponse, ClientError>;
}

// ── edgequake-llm implementation ─────────────────────────────────────────

/// [`ModelClient`] backed by one edgequake-llm provider per model.
///
/// Providers are constructed up front. A model whose provider cannot be
/// created (missing API key, unknown provider) is remembered and reported as
/// [`ClientError::Unavailable`] when called, so the invoker skips it.
pub struct LlmModelClient {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
    unavailable: HashMap<String, String>,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl LlmModelClient {
    /// Build providers for every model in the chain plus the summary model.
    ///
    /// Provider resolution, from most to least specific:
    /// 1. `config.provider_name`
    /// 2. `EDGEQUAKE_LLM_PROVIDER`
    /// 3. `"gemini"`
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let provider_name = config
            .provider_name
            .clone()
            .or_else(|| {
                std::env::var("EDGEQUAKE_LLM_PROVIDER")
                    .ok()
                    .filter(|p| !p.is_empty())
            })
            .unwrap_or_else(|| "gemini".to_string());

        let mut client = Self {
            providers: HashMap::new(),
            unavailable: HashMap::new(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        };

        let wanted = config
            .models
            .iter()
            .map(String::as_str)
            .chain(config.summary_model());
        for model in wanted {
            if model.trim().is_empty() || client.knows(model) {
                continue;
            }
            match ProviderFactory::create_llm_provider(&provider_name, model) {
                Ok(provider) => {
                    debug!("Provider '{}' ready for model {}", provider_name, model);
                    client.providers.insert(model.to_string(), provider);
                }
                Err(e) => {
                    warn!("Model {} unavailable via '{}': {}", model, provider_name, e);
                    client
                        .unavailable
                        .insert(model.to_string(), format!("provider '{provider_name}': {e}"));
                }
            }
        }
        client
    }

    /// Route `model` to a pre-built provider, replacing any factory-built one.
    pub fn with_provider(mut self, model: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        let model = model.into();
        self.unavailable.remove(&model);
        self.providers.insert(model, provider);
        self
    }

    fn knows(&self, model: &str) -> bool {
        self.providers.contains_key(model) || self.unavailable.contains_key(model)
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelClient for LlmModelClient {
    async fn complete(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<ModelResponse, ClientError> {
        let provider = match self.providers.get(model) {
            Some(p) => Arc::clone(p),
            None => {
                let detail = self
                    .unavailable
                    .get(model)
                    .cloned()
                    .unwrap_or_else(|| "no provider configured".to_string());
                return Err(ClientError::Unavailable {
                    model: model.to_string(),
                    detail,
                });
            }
        };

        let images: Vec<ImageData> = request
            .attachments
            .iter()
            .map(|a| {
                let data = ImageData::new(a.data.clone(), a.mime_type.clone());
                if a.mime_type.starts_with("image/") {
                    data.with_detail("high")
                } else {
                    data
                }
            })
            .collect();

        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user_with_images(request.prompt.as_str(), images),
        ];
        let options = self.options();

        let response = tokio::time::timeout(self.timeout, provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| {
                ClientError::Transient(format!("timed out after {}s", self.timeout.as_secs()))
            })?
            .map_err(|e| ClientError::Transient(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens, finish={:?}",
            model, response.prompt_tokens, response.completion_tokens, response.finish_reason
        );

        Ok(ModelResponse {
            text: response.content,
            finish: FinishReason::from_provider(response.finish_reason.as_deref()),
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}
