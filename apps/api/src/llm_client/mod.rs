/// LLM Client: the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the vendor API directly.
/// Handlers depend on the `ChatModel` trait so tests can swap in a stub.
///
/// The vendor speaks the OpenAI-compatible `/chat/completions` protocol
/// (DeepSeek by default); endpoint, key and model come from `Config`.
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

const MAX_RETRIES: u32 = 3;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured (set LLM_API_KEY or DEEPSEEK_API_KEY)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM response did not contain a JSON object")]
    NoJson,
}

/// Sampling settings for one completion.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Sampling {
    /// Low temperature for factual report writing.
    pub const REPORT: Sampling = Sampling {
        temperature: 0.3,
        max_tokens: 4000,
    };

    /// Higher temperature for prompt-template authoring.
    pub const AUTHORING: Sampling = Sampling {
        temperature: 0.7,
        max_tokens: 4000,
    };
}

/// A chat model that turns a system + user prompt into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str, sampling: Sampling)
        -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for an OpenAI-compatible chat-completion endpoint.
/// Retries 429, 5xx and transport failures with exponential backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    retry_base: Duration,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.llm_api_key.clone(),
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
            retry_base: Duration::from_millis(1000),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the chat-completion API, returning the full response.
    pub async fn call(
        &self,
        system: &str,
        user: &str,
        sampling: Sampling,
    ) -> Result<ChatResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };

        debug!(
            model = %self.model,
            system_len = system.len(),
            user_len = user.len(),
            "Chat completion request"
        );

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: base, 2x base
                let delay = self.retry_base * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat_response: ChatResponse = response.json().await?;

            if let Some(usage) = &chat_response.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: Sampling,
    ) -> Result<String, LlmError> {
        let response = self.call(system, user, sampling).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }
}

/// Pulls the JSON object out of a model reply.
///
/// Prefers a fenced ```json block; otherwise takes the span from the first
/// `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Result<&str, LlmError> {
    if let Some(m) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return Ok(m.as_str());
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(LlmError::NoJson),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// One recorded `complete` call.
    #[derive(Debug, Clone)]
    pub struct StubCall {
        pub system: String,
        pub user: String,
        pub temperature: f32,
    }

    /// Canned-reply model for handler and pipeline tests.
    #[derive(Default)]
    pub struct StubModel {
        reply: Option<String>,
        pub calls: Mutex<Vec<StubCall>>,
    }

    impl StubModel {
        pub fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: Some(reply.into()),
                calls: Mutex::default(),
            }
        }

        /// Every call fails as if the vendor rejected it.
        pub fn failing() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<StubCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for StubModel {
        async fn complete(
            &self,
            system: &str,
            user: &str,
            sampling: Sampling,
        ) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(StubCall {
                system: system.to_string(),
                user: user.to_string(),
                temperature: sampling.temperature,
            });
            self.reply.clone().ok_or(LlmError::Api {
                status: 500,
                message: "stub failure".to_string(),
            })
        }
    }
}
