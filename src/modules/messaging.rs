//! Built-in messaging module
//!
//! Sends, reads, monitors and manages auto-reply registrations on top of a
//! `Messenger` transport. Contact names arrive already resolved; state
//! changes go out as deltas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::error::{AssistError, Result};
use crate::intent::{IntentKind, Slot};
use crate::modules::{CapabilityModule, ModuleKind, ModuleRequest, ModuleResponse, COMPOSED_CONTENT};
use crate::orchestrator::delta::{AutopilotRequest, AutopilotTarget, StateDelta, ToneUpdate};

/// Result of a successful send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub message_id: Option<String>,
}

/// A message as the transport reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    pub from_me: bool,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, contact: &str, text: &str) -> Result<SendOutcome>;

    async fn read_history(&self, contact: &str, limit: usize) -> Result<Vec<TransportMessage>>;
}

pub struct MessagingModule {
    messenger: Arc<dyn Messenger>,
    history_limit: usize,
    autopilot_ttl: i64,
    default_tone: String,
}

impl MessagingModule {
    pub fn new(messenger: Arc<dyn Messenger>, config: &EngineConfig) -> Self {
        Self {
            messenger,
            history_limit: config.messaging.history_limit,
            autopilot_ttl: config.autopilot.ttl_minutes,
            default_tone: config.autopilot.default_tone.clone(),
        }
    }

    async fn send(&self, req: &ModuleRequest<'_>) -> Result<ModuleResponse> {
        let Some(contact) = req.intent.contact() else {
            return Ok(ModuleResponse::text("Who should I send it to?"));
        };
        let composed = req
            .metadata
            .get(COMPOSED_CONTENT)
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let Some(text) = composed.or_else(|| req.intent.content().map(str::to_string)) else {
            return Ok(ModuleResponse::text(format!("What should I say to {}?", contact))
                .with_delta(StateDelta::new().with_last_contact(contact)));
        };

        let outcome = self.messenger.send(contact, &text).await?;
        tracing::info!(contact, message_id = ?outcome.message_id, "message sent");

        let delta = StateDelta {
            sent_text: Some(text),
            ..StateDelta::new().with_last_contact(contact)
        };
        Ok(ModuleResponse::text(format!("Message sent to {}.", contact)).with_delta(delta))
    }

    async fn read(&self, req: &ModuleRequest<'_>) -> Result<ModuleResponse> {
        let Some(contact) = req.intent.contact() else {
            return Ok(ModuleResponse::text("Whose chat should I read?"));
        };
        let history = self.messenger.read_history(contact, self.history_limit).await?;
        let delta = StateDelta::new().with_last_contact(contact);

        if history.is_empty() {
            return Ok(
                ModuleResponse::text(format!("I couldn't find any messages with {}.", contact))
                    .with_delta(delta),
            );
        }
        let lines: Vec<String> = history
            .iter()
            .map(|m| {
                let who = if m.from_me { "You" } else { contact };
                format!("- {}: {}", who, m.text)
            })
            .collect();
        Ok(ModuleResponse::text(format!(
            "Last messages with {}:\n{}",
            contact,
            lines.join("\n")
        ))
        .with_delta(delta))
    }

    async fn check(&self, req: &ModuleRequest<'_>) -> Result<ModuleResponse> {
        if let Some(contact) = req.intent.contact() {
            let latest = self.messenger.read_history(contact, 1).await?;
            let text = match latest.last() {
                Some(m) if !m.from_me => format!("{} wrote: {}", contact, m.text),
                Some(_) => format!("No reply from {} yet.", contact),
                None => format!("Nothing from {} yet.", contact),
            };
            return Ok(ModuleResponse::text(text)
                .with_delta(StateDelta::new().with_last_contact(contact)));
        }

        let incoming: Vec<String> = req
            .context
            .last_messages
            .iter()
            .rev()
            .filter(|m| !m.from_me)
            .take(5)
            .map(|m| format!("- {}: {}", m.contact, m.text))
            .collect();
        if incoming.is_empty() {
            Ok(ModuleResponse::text("No new messages."))
        } else {
            Ok(ModuleResponse::text(format!(
                "Latest messages:\n{}",
                incoming.join("\n")
            )))
        }
    }

    fn monitor(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        let Some(contact) = req.intent.contact() else {
            return ModuleResponse::text("Whose chat should I monitor?");
        };
        if req.context.is_monitoring(contact) {
            return ModuleResponse::text(format!("I'm already monitoring {}.", contact));
        }
        let delta = StateDelta {
            monitored_contact: Some(contact.to_string()),
            ..StateDelta::new().with_last_contact(contact)
        };
        ModuleResponse::text(format!(
            "Now monitoring {}'s chat. I'll let you know when they write.",
            contact
        ))
        .with_delta(delta)
    }

    fn unmonitor(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        let Some(contact) = req.intent.contact() else {
            return ModuleResponse::text("I'm not monitoring anyone right now.");
        };
        if !req.context.is_monitoring(contact) {
            return ModuleResponse::text(format!("I wasn't monitoring {}.", contact));
        }
        let delta = StateDelta {
            remove_monitored_contact: Some(contact.to_string()),
            ..StateDelta::default()
        };
        ModuleResponse::text(format!("Stopped monitoring {}.", contact)).with_delta(delta)
    }

    fn monitor_status(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        let monitored = &req.context.monitored_contacts;
        if let Some(contact) = req.intent.contact() {
            let text = if req.context.is_monitoring(contact) {
                format!("Yes, I'm monitoring {}.", contact)
            } else {
                format!("No, I'm not monitoring {}.", contact)
            };
            return ModuleResponse::text(text);
        }
        match monitored.len() {
            0 => ModuleResponse::text("I'm not monitoring any chats right now."),
            _ => ModuleResponse::text(format!("I'm monitoring: {}.", monitored.join(", "))),
        }
    }

    fn autopilot_enable(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        let Some(contact) = req.intent.contact() else {
            return ModuleResponse::text("Who should I reply to for you?");
        };
        let tone = req
            .intent
            .entity(Slot::Tone)
            .unwrap_or(&self.default_tone)
            .to_string();
        let delta = StateDelta {
            enable_autopilot: Some(AutopilotRequest {
                contact: contact.to_string(),
                tone: Some(tone.clone()),
                ttl_minutes: None,
            }),
            ..StateDelta::new().with_last_contact(contact)
        };
        ModuleResponse::text(format!(
            "Autopilot is on for {} with a {} tone for the next {} minutes.",
            contact, tone, self.autopilot_ttl
        ))
        .with_delta(delta)
    }

    fn autopilot_disable(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        match req.intent.contact() {
            Some(contact) => {
                if req.context.autopilot_for(contact).is_none() {
                    return ModuleResponse::text(format!("Autopilot wasn't on for {}.", contact));
                }
                let delta = StateDelta {
                    disable_autopilot: Some(AutopilotTarget {
                        contact: Some(contact.to_string()),
                    }),
                    ..StateDelta::default()
                };
                ModuleResponse::text(format!("Autopilot is off for {}.", contact)).with_delta(delta)
            }
            None if req.context.autopilot.is_empty() => {
                ModuleResponse::text("Autopilot isn't on for anyone.")
            }
            None => {
                let delta = StateDelta {
                    disable_autopilot: Some(AutopilotTarget { contact: None }),
                    ..StateDelta::default()
                };
                ModuleResponse::text("Autopilot is off for everyone.").with_delta(delta)
            }
        }
    }

    fn autopilot_status(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        let now = Utc::now();
        if let Some(contact) = req.intent.contact() {
            return match req.context.autopilot_for(contact) {
                Some(entry) => ModuleResponse::text(format!(
                    "Autopilot is on for {} ({} tone, {} minutes left).",
                    entry.contact,
                    entry.tone,
                    entry.minutes_left(now)
                )),
                None => ModuleResponse::text(format!("Autopilot is off for {}.", contact)),
            };
        }
        if req.context.autopilot.is_empty() {
            return ModuleResponse::text("Autopilot isn't on for anyone.");
        }
        let lines: Vec<String> = req
            .context
            .autopilot
            .iter()
            .map(|e| format!("- {} ({} tone, {} minutes left)", e.contact, e.tone, e.minutes_left(now)))
            .collect();
        ModuleResponse::text(format!("Autopilot is on for:\n{}", lines.join("\n")))
    }

    fn autopilot_tone(&self, req: &ModuleRequest<'_>) -> ModuleResponse {
        let (Some(contact), Some(tone)) = (req.intent.contact(), req.intent.entity(Slot::Tone)) else {
            return ModuleResponse::text("Which contact and which tone?");
        };
        if req.context.autopilot_for(contact).is_none() {
            return ModuleResponse::text(format!(
                "Autopilot isn't on for {}. Want me to turn it on?",
                contact
            ));
        }
        let delta = StateDelta {
            update_autopilot_tone: Some(ToneUpdate {
                contact: contact.to_string(),
                tone: tone.to_string(),
            }),
            ..StateDelta::default()
        };
        ModuleResponse::text(format!("I'll use a {} tone with {} from now on.", tone, contact))
            .with_delta(delta)
    }
}

#[async_trait]
impl CapabilityModule for MessagingModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Messaging
    }

    async fn process(&self, req: ModuleRequest<'_>) -> Result<ModuleResponse> {
        match req.intent.kind {
            IntentKind::SendMessage | IntentKind::Reply => self.send(&req).await,
            IntentKind::ReadHistory => self.read(&req).await,
            IntentKind::CheckMessages => self.check(&req).await,
            IntentKind::Monitor => Ok(self.monitor(&req)),
            IntentKind::MonitorDisable => Ok(self.unmonitor(&req)),
            IntentKind::MonitorStatus => Ok(self.monitor_status(&req)),
            IntentKind::AutopilotEnable => Ok(self.autopilot_enable(&req)),
            IntentKind::AutopilotDisable => Ok(self.autopilot_disable(&req)),
            IntentKind::AutopilotStatus => Ok(self.autopilot_status(&req)),
            IntentKind::AutopilotSetTone => Ok(self.autopilot_tone(&req)),
            other => Err(AssistError::module(
                "messaging",
                format!("unsupported intent {}", other.as_str()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSnapshot;
    use crate::intent::Intent;
    use crate::modules::Metadata;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(String, String)>>,
        history: Vec<TransportMessage>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, contact: &str, text: &str) -> Result<SendOutcome> {
            self.sent
                .lock()
                .unwrap()
                .push((contact.to_string(), text.to_string()));
            Ok(SendOutcome::default())
        }

        async fn read_history(&self, _contact: &str, limit: usize) -> Result<Vec<TransportMessage>> {
            Ok(self.history.iter().take(limit).cloned().collect())
        }
    }

    fn module(messenger: Arc<RecordingMessenger>) -> MessagingModule {
        MessagingModule::new(messenger, &EngineConfig::default())
    }

    async fn run(module: &MessagingModule, intent: Intent, ctx: &ContextSnapshot) -> ModuleResponse {
        let metadata = Metadata::new();
        module
            .process(ModuleRequest {
                message: "",
                intent: &intent,
                context: ctx,
                metadata: &metadata,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_records_delta() {
        let messenger = Arc::new(RecordingMessenger::default());
        let module = module(messenger.clone());
        let intent = Intent::new(IntentKind::SendMessage, 0.9)
            .with_entity(Slot::Contact, "Juliana")
            .with_entity(Slot::Content, "I'm running late");

        let response = run(&module, intent, &ContextSnapshot::default()).await;
        assert_eq!(response.text, "Message sent to Juliana.");
        assert_eq!(response.delta.last_contact.as_deref(), Some("Juliana"));
        assert_eq!(response.delta.sent_text.as_deref(), Some("I'm running late"));
        assert_eq!(
            messenger.sent.lock().unwrap().as_slice(),
            &[("Juliana".to_string(), "I'm running late".to_string())]
        );
    }

    #[tokio::test]
    async fn test_send_without_content_asks() {
        let messenger = Arc::new(RecordingMessenger::default());
        let module = module(messenger.clone());
        let intent = Intent::new(IntentKind::SendMessage, 0.9).with_entity(Slot::Contact, "Ana");

        let response = run(&module, intent, &ContextSnapshot::default()).await;
        assert_eq!(response.text, "What should I say to Ana?");
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_history_formats_lines() {
        let messenger = Arc::new(RecordingMessenger {
            history: vec![
                TransportMessage {
                    from_me: false,
                    text: "are you coming?".into(),
                    timestamp: None,
                },
                TransportMessage {
                    from_me: true,
                    text: "yes".into(),
                    timestamp: None,
                },
            ],
            ..RecordingMessenger::default()
        });
        let module = module(messenger);
        let intent = Intent::new(IntentKind::ReadHistory, 0.9).with_entity(Slot::Contact, "Ana");

        let response = run(&module, intent, &ContextSnapshot::default()).await;
        assert_eq!(
            response.text,
            "Last messages with Ana:\n- Ana: are you coming?\n- You: yes"
        );
    }

    #[tokio::test]
    async fn test_monitor_and_unmonitor() {
        let module = module(Arc::new(RecordingMessenger::default()));
        let intent = Intent::new(IntentKind::Monitor, 0.9).with_entity(Slot::Contact, "Paulo");
        let response = run(&module, intent, &ContextSnapshot::default()).await;
        assert_eq!(response.delta.monitored_contact.as_deref(), Some("Paulo"));

        let mut ctx = ContextSnapshot::default();
        ctx.monitored_contacts = vec!["Paulo".into()];
        let intent =
            Intent::new(IntentKind::MonitorDisable, 0.95).with_entity(Slot::Contact, "paulo");
        let response = run(&module, intent, &ctx).await;
        assert_eq!(response.delta.remove_monitored_contact.as_deref(), Some("paulo"));
    }

    #[tokio::test]
    async fn test_autopilot_enable_uses_default_tone() {
        let module = module(Arc::new(RecordingMessenger::default()));
        let intent =
            Intent::new(IntentKind::AutopilotEnable, 0.9).with_entity(Slot::Contact, "Ana");
        let response = run(&module, intent, &ContextSnapshot::default()).await;

        let request = response.delta.enable_autopilot.unwrap();
        assert_eq!(request.contact, "Ana");
        assert_eq!(request.tone.as_deref(), Some("friendly"));
        assert!(response.text.contains("120 minutes"));
    }

    #[tokio::test]
    async fn test_unsupported_intent_is_error() {
        let module = module(Arc::new(RecordingMessenger::default()));
        let intent = Intent::new(IntentKind::Weather, 0.9);
        let metadata = Metadata::new();
        let result = module
            .process(ModuleRequest {
                message: "weather",
                intent: &intent,
                context: &ContextSnapshot::default(),
                metadata: &metadata,
            })
            .await;
        assert!(matches!(result, Err(AssistError::Module { .. })));
    }
}
