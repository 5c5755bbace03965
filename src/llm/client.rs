//! HTTP generator
//!
//! Talks to Anthropic's messages API or any OpenAI-compatible chat API.
//! Used for conversation replies and for the compose step of plans; never
//! for deciding what the user meant.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::LlmConfig;
use crate::core::error::{AssistError, Result};
use crate::core::types::ChatMessage;
use crate::llm::{Generation, Generator};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Wire dialect, picked from the endpoint URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAiCompatible,
}

impl Provider {
    pub fn from_url(url: &str) -> Self {
        if url.contains("anthropic.com") {
            Provider::Anthropic
        } else {
            Provider::OpenAiCompatible
        }
    }
}

pub struct LlmClient {
    http: Client,
    api_key: String,
    endpoint: String,
    model: String,
    provider: Provider,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            provider: Provider::from_url(&endpoint),
            endpoint,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build a client from `LLM_API_KEY`, with `LLM_API_URL` and `LLM_MODEL`
    /// overriding the configured endpoint and model
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| AssistError::Llm("LLM_API_KEY not set".into()))?;
        let endpoint = std::env::var("LLM_API_URL").unwrap_or_else(|_| config.api_url.clone());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| config.model.clone());
        Ok(Self::new(api_key, endpoint, model))
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorized(&self) -> RequestBuilder {
        let request = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/json");
        match self.provider {
            Provider::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::OpenAiCompatible => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, body: &B) -> Result<R> {
        let response = self
            .authorized()
            .json(body)
            .send()
            .await
            .map_err(|e| AssistError::Llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AssistError::Llm(format!("HTTP {}: {}", status, detail)));
        }
        response
            .json()
            .await
            .map_err(|e| AssistError::Llm(e.to_string()))
    }

    fn generation(&self, text: String, stop_reason: Option<String>) -> Generation {
        let mut metadata = serde_json::Map::new();
        metadata.insert("model".into(), json!(self.model));
        if let Some(reason) = stop_reason {
            metadata.insert("stop_reason".into(), json!(reason));
        }
        Generation { text, metadata }
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn generate(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<Generation> {
        let turns = messages.iter().map(WireMessage::from);
        tracing::debug!(model = %self.model, messages = messages.len(), "generating");

        match self.provider {
            Provider::Anthropic => {
                let body = AnthropicBody {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    system: system_prompt,
                    messages: turns.collect(),
                };
                let reply: AnthropicReply = self.post(&body).await?;
                let text = reply
                    .content
                    .into_iter()
                    .find_map(|block| block.text)
                    .ok_or_else(|| AssistError::Generation("no text block in reply".into()))?;
                Ok(self.generation(text, reply.stop_reason))
            }
            Provider::OpenAiCompatible => {
                let mut wire = vec![WireMessage {
                    role: "system",
                    content: system_prompt,
                }];
                wire.extend(turns);
                let body = ChatBody {
                    model: &self.model,
                    max_tokens: self.max_tokens,
                    messages: wire,
                };
                let reply: ChatReply = self.post(&body).await?;
                let choice = reply
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| AssistError::Generation("no choices in reply".into()))?;
                Ok(self.generation(choice.message.content.unwrap_or_default(), choice.finish_reason))
            }
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(msg: &'a ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

#[derive(Serialize)]
struct AnthropicBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicReply {
    content: Vec<AnthropicBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
