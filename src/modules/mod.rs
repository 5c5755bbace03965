//! Capability modules
//!
//! Everything that actually does something (sending messages, searching,
//! answering small talk) sits behind `CapabilityModule`. The orchestrator
//! picks one by `ModuleKind` and folds its `StateDelta` back into context.

pub mod conversation;
pub mod memory;
pub mod messaging;

pub use conversation::ConversationModule;
pub use memory::{JsonlMemory, MemoryStore};
pub use messaging::{Messenger, MessagingModule, SendOutcome, TransportMessage};

use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::ContextSnapshot;
use crate::core::error::Result;
use crate::intent::Intent;
use crate::orchestrator::delta::StateDelta;

/// Free-form per-request metadata (`source`, `composed_content`, ...)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key carrying plan output that must be sent verbatim
pub const COMPOSED_CONTENT: &str = "composed_content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Messaging,
    Conversation,
    Calendar,
    Search,
    Weather,
    News,
    Translation,
    Files,
    System,
    Productivity,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Messaging => "messaging",
            ModuleKind::Conversation => "conversation",
            ModuleKind::Calendar => "calendar",
            ModuleKind::Search => "search",
            ModuleKind::Weather => "weather",
            ModuleKind::News => "news",
            ModuleKind::Translation => "translation",
            ModuleKind::Files => "files",
            ModuleKind::System => "system",
            ModuleKind::Productivity => "productivity",
        }
    }
}

pub struct ModuleRequest<'a> {
    pub message: &'a str,
    pub intent: &'a Intent,
    pub context: &'a ContextSnapshot,
    pub metadata: &'a Metadata,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleResponse {
    pub text: String,
    pub delta: StateDelta,
}

impl ModuleResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delta: StateDelta::default(),
        }
    }

    pub fn with_delta(mut self, delta: StateDelta) -> Self {
        self.delta = delta;
        self
    }
}

#[async_trait]
pub trait CapabilityModule: Send + Sync {
    fn kind(&self) -> ModuleKind;

    async fn process(&self, request: ModuleRequest<'_>) -> Result<ModuleResponse>;
}

/// Registered modules, one per kind
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: AHashMap<ModuleKind, Arc<dyn CapabilityModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any previous one of the same kind
    pub fn register(&mut self, module: Arc<dyn CapabilityModule>) {
        tracing::debug!(module = module.kind().as_str(), "module registered");
        self.modules.insert(module.kind(), module);
    }

    pub fn get(&self, kind: ModuleKind) -> Option<&Arc<dyn CapabilityModule>> {
        self.modules.get(&kind)
    }

    pub fn contains(&self, kind: ModuleKind) -> bool {
        self.modules.contains_key(&kind)
    }
}
