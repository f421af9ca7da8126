//! Language-model interaction: the [`VisionModel`] seam and its
//! `edgequake-llm` implementation.
//!
//! The orchestrator only needs two operations, "summarise this text" and
//! "describe this image", so it is generic over [`VisionModel`] and tests
//! drive it with scripted doubles. [`LlmClient`] is the production
//! implementation; prompt wording lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 2 retries the wait sequence
//! is 500 ms → 1 s. Every attempt is bounded by `api_timeout_secs`.

use crate::config::{SummaryConfig, DEFAULT_MODEL};
use crate::error::{ModelError, SummaryError};
use crate::pipeline::encode;
use crate::prompts::{text_request, DEFAULT_IMAGE_PROMPT, DEFAULT_TEXT_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Token usage accumulated by a model client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A multimodal model able to summarise text and describe images.
///
/// Implementations must be shareable across concurrently processed pages.
pub trait VisionModel: Send + Sync {
    /// Summarise one chunk of page text.
    fn summarize_text(&self, text: &str) -> impl Future<Output = Result<String, ModelError>> + Send;

    /// Describe one PNG-encoded image.
    fn analyze_image(&self, png: &[u8]) -> impl Future<Output = Result<String, ModelError>> + Send;

    /// Tokens consumed so far, when the implementation tracks them.
    fn usage(&self) -> ModelUsage {
        ModelUsage::default()
    }
}

/// [`VisionModel`] backed by an `edgequake-llm` provider.
pub struct LlmClient {
    provider: Arc<dyn LLMProvider>,
    text_prompt: String,
    image_prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout_secs: u64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &"<dyn LLMProvider>")
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Wrap an existing provider, taking prompts and call limits from `config`.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SummaryConfig) -> Self {
        Self {
            provider,
            text_prompt: config
                .text_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_PROMPT.to_string()),
            image_prompt: config
                .image_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            timeout_secs: config.api_timeout_secs,
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        }
    }

    /// Resolve the provider from `config` and the environment, then wrap it.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, SummaryError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }

    /// Send `messages`, retrying with exponential backoff.
    async fn call(&self, what: &str, messages: Vec<ChatMessage>) -> Result<String, ModelError> {
        let start = Instant::now();
        let options = build_options(self.temperature, self.max_tokens);
        let limit = Duration::from_secs(self.timeout_secs);
        let mut last_err: Option<ModelError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    what, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(limit, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    self.input_tokens
                        .fetch_add(response.prompt_tokens as u64, Ordering::Relaxed);
                    self.output_tokens
                        .fetch_add(response.completion_tokens as u64, Ordering::Relaxed);
                    debug!(
                        "{}: {} input tokens, {} output tokens, {:?}",
                        what,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("{}: attempt {} failed: {}", what, attempt + 1, e);
                    last_err = Some(ModelError::Failed {
                        retries: self.max_retries,
                        detail: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        "{}: attempt {} timed out after {}s",
                        what,
                        attempt + 1,
                        self.timeout_secs
                    );
                    last_err = Some(ModelError::Timeout {
                        secs: self.timeout_secs,
                        retries: self.max_retries,
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ModelError::Failed {
            retries: self.max_retries,
            detail: "Unknown error".to_string(),
        }))
    }
}

impl VisionModel for LlmClient {
    async fn summarize_text(&self, text: &str) -> Result<String, ModelError> {
        let messages = vec![ChatMessage::user(text_request(&self.text_prompt, text))];
        self.call("text summary", messages).await
    }

    async fn analyze_image(&self, png: &[u8]) -> Result<String, ModelError> {
        let messages = vec![ChatMessage::user_with_images(
            self.image_prompt.as_str(),
            vec![encode::to_image_data(png)],
        )];
        self.call("image description", messages).await
    }

    fn usage(&self) -> ModelUsage {
        ModelUsage {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SummaryError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SummaryError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`), API key read from
///    the environment by the factory.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are set.
/// 4. **OpenAI** when `OPENAI_API_KEY` is present, so users with several
///    keys get a predictable default.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &SummaryConfig) -> Result<Arc<dyn LLMProvider>, SummaryError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SummaryError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor)
}
