//! Conversation fallback module
//!
//! Answers small talk and questions through the `Generator`, with recent
//! history and a short note about what the assistant is tracking.

use async_trait::async_trait;
use std::sync::Arc;

use crate::context::ContextSnapshot;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{ChatMessage, Role};
use crate::llm::Generator;
use crate::modules::{CapabilityModule, ModuleKind, ModuleRequest, ModuleResponse};

const EMPTY_REPLY: &str = "I'm not sure what to say to that.";

pub struct ConversationModule {
    generator: Arc<dyn Generator>,
    assistant_name: String,
    prompt_history: usize,
}

impl ConversationModule {
    pub fn new(generator: Arc<dyn Generator>, config: &EngineConfig) -> Self {
        Self {
            generator,
            assistant_name: config.assistant_name.clone(),
            prompt_history: config.context.prompt_history,
        }
    }

    fn system_prompt(&self, ctx: &ContextSnapshot) -> String {
        let mut prompt = format!(
            "You are {}, a personal assistant. Answer briefly and naturally.",
            self.assistant_name
        );
        if !ctx.monitored_contacts.is_empty() {
            prompt.push_str(&format!(
                " You are monitoring the chats of: {}.",
                ctx.monitored_contacts.join(", ")
            ));
        }
        if let Some(contact) = &ctx.last_contact {
            prompt.push_str(&format!(" The last contact mentioned was {}.", contact));
        }
        prompt
    }
}

#[async_trait]
impl CapabilityModule for ConversationModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Conversation
    }

    async fn process(&self, req: ModuleRequest<'_>) -> Result<ModuleResponse> {
        let mut messages = req.context.recent_messages(self.prompt_history);
        let already_there = messages
            .last()
            .is_some_and(|m| m.role == Role::User && m.content == req.message);
        if !already_there {
            messages.push(ChatMessage::user(req.message));
        }

        let generation = self
            .generator
            .generate(&self.system_prompt(req.context), &messages)
            .await?;
        let text = generation.text.trim();
        if text.is_empty() {
            return Ok(ModuleResponse::text(EMPTY_REPLY));
        }
        Ok(ModuleResponse::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::llm::Generation;
    use crate::modules::Metadata;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoGenerator {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<Generation> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok(Generation::text(format!("{} | {}", system_prompt.len(), messages.len())))
        }
    }

    #[tokio::test]
    async fn test_appends_current_message_once() {
        let generator = Arc::new(EchoGenerator::default());
        let module = ConversationModule::new(generator.clone(), &EngineConfig::default());
        let intent = Intent::conversation();
        let metadata = Metadata::new();

        module
            .process(ModuleRequest {
                message: "how are you?",
                intent: &intent,
                context: &ContextSnapshot::default(),
                metadata: &metadata,
            })
            .await
            .unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[ChatMessage::user("how are you?")]);
    }

    #[test]
    fn test_system_prompt_mentions_monitored() {
        let module = ConversationModule::new(
            Arc::new(EchoGenerator::default()),
            &EngineConfig::default(),
        );
        let mut ctx = ContextSnapshot::default();
        ctx.monitored_contacts = vec!["Ana".into()];
        let prompt = module.system_prompt(&ctx);
        assert!(prompt.starts_with("You are Parley"));
        assert!(prompt.contains("monitoring the chats of: Ana"));
    }
}
