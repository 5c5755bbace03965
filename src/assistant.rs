//! Per-turn driver
//!
//! Owns the `ContextManager` and runs one message at a time: record the
//! user message, snapshot, process, apply the delta, record the reply and
//! only then persist.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::contacts::normalize;
use crate::context::ContextManager;
use crate::core::error::Result;
use crate::core::types::{MessageSource, Role};
use crate::modules::Metadata;
use crate::orchestrator::Orchestrator;

pub struct Assistant {
    orchestrator: Orchestrator,
    context: ContextManager,
    state_path: Option<PathBuf>,
}

impl Assistant {
    pub fn new(orchestrator: Orchestrator, context: ContextManager) -> Self {
        Self {
            orchestrator,
            context,
            state_path: None,
        }
    }

    /// Persist long-lived context to `path` after every turn
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Load previously persisted context, if any
    pub fn restore(&mut self) -> Result<()> {
        match &self.state_path {
            Some(path) => self.context.load(path),
            None => Ok(()),
        }
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ContextManager {
        &mut self.context
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Process one user message and return the reply
    pub async fn handle(&mut self, message: &str, source: MessageSource) -> Result<String> {
        self.context.add_message(Role::User, message, source);
        let snapshot = self.context.get_context();

        let mut metadata = Metadata::new();
        metadata.insert("source".into(), serde_json::to_value(source)?);

        let turn = match self
            .orchestrator
            .process_with_metadata(message, &snapshot, &metadata)
            .await
        {
            Ok(turn) => turn,
            Err(e) => {
                // the user message is already in history; keep it on disk
                self.persist();
                return Err(e);
            }
        };

        self.context.apply(&turn.delta);
        self.context
            .add_message(Role::Assistant, turn.response.clone(), source);
        self.persist();
        Ok(turn.response)
    }

    /// Record a message that arrived from a contact
    ///
    /// Returns a notification when the contact's chat is being monitored.
    pub fn receive(&mut self, contact: &str, text: &str) -> Option<String> {
        self.context.update_last_message(contact, text, false);
        let monitored = self
            .context
            .monitored_contacts()
            .iter()
            .any(|c| normalize(c) == normalize(contact));
        let autopilot = self.context.is_autopilot_enabled(contact);
        debug!(contact, monitored, autopilot, "incoming message");
        self.persist();

        match (monitored, autopilot) {
            (true, true) => Some(format!(
                "New message from {}: {} (autopilot will reply)",
                contact, text
            )),
            (true, false) => Some(format!("New message from {}: {}", contact, text)),
            _ => None,
        }
    }

    fn persist(&self) {
        if let Some(path) = &self.state_path {
            if let Err(e) = self.context.save(path) {
                warn!(path = %path.display(), error = %e, "failed to persist context");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;

    fn assistant() -> Assistant {
        let config = EngineConfig::default();
        Assistant::new(
            Orchestrator::new(config.clone()).unwrap(),
            ContextManager::from_config(&config),
        )
    }

    #[tokio::test]
    async fn test_plan_survives_into_next_turn() {
        let mut assistant = assistant();
        let reply = assistant
            .handle("send Ana a message introducing myself", MessageSource::Text)
            .await
            .unwrap();
        assert!(reply.ends_with("Shall I proceed?"));

        let reply = assistant.handle("hmm, not sure", MessageSource::Text).await.unwrap();
        assert_eq!(reply, "Shall I proceed? (Answer yes or no.)");
        let plan = assistant.context().pending_plan().unwrap();
        assert_eq!(plan.target_contact(), "Ana");

        let reply = assistant.handle("no", MessageSource::Text).await.unwrap();
        assert_eq!(reply, "Task cancelled.");
        assert!(assistant.context().pending_plan().is_none());
    }

    #[test]
    fn test_receive_notifies_for_monitored() {
        let mut assistant = assistant();
        assistant.context_mut().add_monitored_contact("Ana");

        assert_eq!(
            assistant.receive("ana", "are you there?").as_deref(),
            Some("New message from ana: are you there?")
        );
        assert_eq!(assistant.receive("Bia", "hi"), None);
        assert_eq!(
            assistant.context().last_message("Bia").map(|m| m.text.as_str()),
            Some("hi")
        );
    }
}
