//! Text generation
//!
//! The engine only needs "system prompt + messages in, text out". The HTTP
//! client in `client` is one implementation; tests supply their own.

pub mod client;

pub use client::LlmClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::ChatMessage;

/// Generator output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<Generation>;
}
