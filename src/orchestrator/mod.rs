//! Orchestrator: one user message in, one response and one state delta out
//!
//! Per message, in order:
//! 1. a plan awaiting confirmation only listens for yes / no
//! 2. a parked low-confidence intent only listens for yes / no
//! 3. a pending send suggestion may be accepted or declined
//! 4. a stop phrase clears soft prompts
//! 5. compound commands run clause by clause
//! 6. classify, then compose-plan / recipient checks / contact resolution
//! 7. confidence gate
//! 8. route to a capability module (conversation retry on failure)
//!
//! The orchestrator never mutates context; the caller applies the delta.

pub mod delta;
pub mod policy;

pub use delta::StateDelta;

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::contacts::{Contact, ContactDirectory, ContactResolver, Resolution};
use crate::context::ContextSnapshot;
use crate::core::config::EngineConfig;
use crate::core::error::{AssistError, Result};
use crate::core::types::ChatMessage;
use crate::intent::{Intent, IntentClassifier, IntentKind, Slot};
use crate::llm::Generator;
use crate::modules::{
    CapabilityModule, MemoryStore, Metadata, ModuleKind, ModuleRegistry, ModuleRequest,
    COMPOSED_CONTENT,
};
use crate::orchestrator::delta::{PendingConfirmation, SuggestedSend};
use crate::plan::{ComposePolicy, ExecutionPlan};

const REPROMPT: &str = "Shall I proceed? (Answer yes or no.)";
const DECLINED: &str = "Okay, I won't do that.";
const STOPPED: &str = "Okay, stopping.";
const ASK_RECIPIENT: &str = "Who should I send the message to? Tell me the contact's name.";
const SEND_HINT: &str = "It sounds like you want to send a message. Tell me who to and what, \
                         for example \"send Ana a message saying I'm on my way\".";
const APOLOGY: &str = "Sorry, something went wrong while handling that. Please try again.";
const UNAVAILABLE: &str = "Sorry, I can't handle that right now.";

/// Longest composed message the plan will send
const MAX_COMPOSED_CHARS: usize = 2000;

/// Words that can follow "monitor X and" without naming a second contact
const NOT_A_NAME: &[&str] = &[
    "monitor", "read", "check", "see", "reply", "send", "tell", "let", "then", "me", "also",
    "message", "text", "write", "show", "his", "her", "their",
];

/// Result of one processed message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    pub response: String,
    pub delta: StateDelta,
}

impl Turn {
    pub fn new(response: impl Into<String>, delta: StateDelta) -> Self {
        Self {
            response: response.into(),
            delta,
        }
    }

    pub fn reply(response: impl Into<String>) -> Self {
        Self::new(response, StateDelta::default())
    }
}

pub struct Orchestrator {
    config: EngineConfig,
    classifier: IntentClassifier,
    resolver: ContactResolver,
    compose: ComposePolicy,
    modules: ModuleRegistry,
    directory: Option<Arc<dyn ContactDirectory>>,
    generator: Option<Arc<dyn Generator>>,
    memory: Option<Arc<dyn MemoryStore>>,
    monitor_pair: Regex,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            classifier: IntentClassifier::new()?,
            resolver: ContactResolver::new(config.resolver.clone()),
            compose: ComposePolicy::new(&config.compose),
            modules: ModuleRegistry::new(),
            directory: None,
            generator: None,
            memory: None,
            monitor_pair: Regex::new(
                r"(?i)\bmonitor(?:ing)?\s+(?:the\s+chats?\s+(?:of|with|from)\s+)?(\w+)\s+and\s+(\w+)",
            )?,
            config,
        })
    }

    pub fn with_module(mut self, module: Arc<dyn CapabilityModule>) -> Self {
        self.modules.register(module);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn ContactDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Generator used for the compose step of plans
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub async fn process(&self, message: &str, ctx: &ContextSnapshot) -> Result<Turn> {
        self.process_with_metadata(message, ctx, &Metadata::new())
            .await
    }

    /// Process one user message; `metadata` is passed through to modules
    pub async fn process_with_metadata(
        &self,
        message: &str,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
    ) -> Result<Turn> {
        let outcome = self.dispatch(message.trim(), ctx, metadata).await;
        self.settle(message, ctx, outcome).await
    }

    /// Save the turn to memory whether or not it succeeded
    async fn settle(
        &self,
        message: &str,
        ctx: &ContextSnapshot,
        outcome: Result<(Turn, String)>,
    ) -> Result<Turn> {
        match outcome {
            Ok((mut turn, label)) => {
                if ctx.suggested_send.is_some() && turn.delta.set_suggested_send.is_none() {
                    turn.delta.clear_suggested_send = true;
                }
                self.remember(message, &turn.response, &label).await;
                Ok(turn)
            }
            Err(e) => {
                error!(error = %e, "turn failed");
                self.remember(message, APOLOGY, "error").await;
                Err(e)
            }
        }
    }

    /// Run an already classified intent through the compose, resolution,
    /// gate and routing stages
    pub async fn process_classified(
        &self,
        message: &str,
        intent: Intent,
        ctx: &ContextSnapshot,
    ) -> Result<Turn> {
        self.handle_intent(message, intent, ctx, &Metadata::new())
            .await
    }

    async fn dispatch(
        &self,
        message: &str,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
    ) -> Result<(Turn, String)> {
        if let Some(plan) = ctx.pending_plan.as_ref().filter(|p| p.is_awaiting()) {
            let turn = self.resolve_plan(plan, message, ctx, metadata).await?;
            return Ok((turn, "plan".into()));
        }

        if let Some(pending) = &ctx.pending_confirmation {
            let label = pending.intent.kind.as_str().to_string();
            let turn = if policy::is_affirm(message) {
                info!(kind = %label, "gated intent confirmed");
                let mut turn = self
                    .route(&pending.message, pending.intent.clone(), ctx, metadata)
                    .await;
                turn.delta.clear_pending_confirmation = true;
                turn
            } else {
                Turn::new(
                    DECLINED,
                    StateDelta {
                        clear_pending_confirmation: true,
                        ..StateDelta::default()
                    },
                )
            };
            return Ok((turn, label));
        }

        if let Some(suggestion) = &ctx.suggested_send {
            if policy::is_affirm(message) {
                return Ok((self.accept_suggestion(suggestion)?, "suggested_send".into()));
            }
            if policy::is_cancel(message) {
                let delta = StateDelta {
                    clear_suggested_send: true,
                    ..StateDelta::default()
                };
                return Ok((Turn::new("All right.", delta), "suggested_send".into()));
            }
        }

        if policy::is_stop(message) {
            let delta = StateDelta {
                clear_suggested_send: true,
                clear_pending_confirmation: true,
                ..StateDelta::default()
            };
            return Ok((Turn::new(STOPPED, delta), "stop".into()));
        }

        let parts = self.classifier.split_compound(message);
        if parts.len() > 1 {
            debug!(clauses = parts.len(), "compound command");
            let mut snapshot = ctx.clone();
            let mut responses = Vec::with_capacity(parts.len());
            let mut delta = StateDelta::new();
            for part in parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
                let intent = self.classifier.classify(part, &snapshot);
                let turn = self.handle_intent(part, intent, &snapshot, metadata).await?;
                snapshot.absorb(&turn.delta);
                responses.push(turn.response);
                delta.merge(turn.delta);
            }
            return Ok((Turn::new(responses.join("\n\n"), delta), "compound".into()));
        }

        let intent = self.classifier.classify(message, ctx);
        let label = intent.kind.as_str().to_string();
        let turn = self.handle_intent(message, intent, ctx, metadata).await?;
        Ok((turn, label))
    }

    async fn handle_intent(
        &self,
        message: &str,
        mut intent: Intent,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
    ) -> Result<Turn> {
        info!(
            kind = intent.kind.as_str(),
            confidence = intent.confidence,
            "intent classified"
        );
        let threshold = self.config.confidence_threshold;

        if matches!(intent.kind, IntentKind::SendMessage | IntentKind::Reply)
            && self.compose.is_compose_request(message)
        {
            return self.plan_compose(message, &intent).await;
        }

        if intent.kind == IntentKind::SendMessage && intent.contact().is_none() {
            return Ok(Turn::reply(ASK_RECIPIENT));
        }

        if intent.kind == IntentKind::Conversation && intent.confidence < threshold {
            if policy::has_send_verb(message) {
                return Ok(Turn::reply(SEND_HINT));
            }
            if let Some((contact, tone)) = policy::send_continuation(message) {
                let response = format!("Got it. Want me to send a {} message to {}?", tone, contact);
                let delta = StateDelta {
                    set_suggested_send: Some(SuggestedSend {
                        contact,
                        tone: Some(tone),
                    }),
                    ..StateDelta::default()
                };
                return Ok(Turn::new(response, delta));
            }
        }

        if intent.kind == IntentKind::Monitor {
            if let Some((first, second)) = self.two_monitor_targets(message) {
                return Ok(Turn::reply(format!(
                    "I can monitor one chat at a time. Which one first: {} or {}?",
                    first, second
                )));
            }
        }

        if let Err(question) = self.resolve_contact(&mut intent).await {
            return Ok(Turn::reply(question));
        }

        if intent.confidence < threshold && !policy::is_safe(intent.kind) {
            info!(
                kind = intent.kind.as_str(),
                confidence = intent.confidence,
                "low confidence, asking first"
            );
            let question = format!(
                "Do you want me to {}? (Answer yes to confirm.)",
                intent.kind.describe()
            );
            let delta = StateDelta {
                pending_confirmation: Some(PendingConfirmation {
                    intent,
                    message: message.to_string(),
                }),
                ..StateDelta::default()
            };
            return Ok(Turn::new(question, delta));
        }

        Ok(self.route(message, intent, ctx, metadata).await)
    }

    // === PLANS ===

    async fn plan_compose(&self, message: &str, intent: &Intent) -> Result<Turn> {
        let mut targets = self.classifier.send_targets(message);
        if targets.is_empty() {
            targets.extend(intent.contact().map(str::to_string));
        }
        let Some(first) = targets.first() else {
            return Ok(Turn::reply(ASK_RECIPIENT));
        };

        let mut target = Intent::new(intent.kind, intent.confidence).with_entity(Slot::Contact, first);
        if let Err(question) = self.resolve_contact(&mut target).await {
            return Ok(Turn::reply(question));
        }
        let contact = target.contact().unwrap_or(first.as_str()).to_string();

        let mut plan = ExecutionPlan::compose_and_send(contact, message);
        plan.request_confirmation()?;

        let mut response = plan.confirmation_prompt();
        if let Some(second) = targets.get(1) {
            response = format!(
                "I can only send to one contact at a time, so I'll start with {}. Ask me again for {} afterwards.\n{}",
                plan.target_contact(),
                second,
                response
            );
        }
        Ok(Turn::new(
            response,
            StateDelta::new()
                .with_pending_plan(plan)
                .with_last_intent(intent.kind),
        ))
    }

    async fn resolve_plan(
        &self,
        plan: &ExecutionPlan,
        message: &str,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
    ) -> Result<Turn> {
        if policy::is_affirm(message) {
            return self.execute_plan(plan.clone(), ctx, metadata).await;
        }
        if policy::is_cancel(message) {
            let mut plan = plan.clone();
            plan.cancel()?;
            return Ok(Turn::new(
                "Task cancelled.",
                StateDelta::new().clearing_pending_plan(),
            ));
        }
        debug!(plan = ?plan.id(), "reply is neither yes nor no, plan untouched");
        Ok(Turn::reply(REPROMPT))
    }

    async fn execute_plan(
        &self,
        mut plan: ExecutionPlan,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
    ) -> Result<Turn> {
        let contact = plan.target_contact().to_string();

        let composed = match self.compose_text(&plan).await {
            Ok(text) => text,
            Err(e) => {
                warn!(plan = ?plan.id(), error = %e, "compose step failed");
                plan.cancel()?;
                let response = match e {
                    AssistError::EmptyGeneration => {
                        "The generated message came out empty, so I cancelled the task."
                    }
                    _ => "I couldn't write the message, so I cancelled the task.",
                };
                return Ok(Turn::new(response, StateDelta::new().clearing_pending_plan()));
            }
        };
        plan.record_composition(composed.clone())?;

        let Some(messaging) = self.modules.get(ModuleKind::Messaging) else {
            plan.cancel()?;
            return Ok(Turn::new(
                "Messaging isn't available right now, so I cancelled the task.",
                StateDelta::new().clearing_pending_plan(),
            ));
        };

        let intent = Intent::new(IntentKind::SendMessage, 1.0).with_entity(Slot::Contact, &contact);
        let mut send_metadata = metadata.clone();
        send_metadata.insert(COMPOSED_CONTENT.into(), composed.into());
        let outcome = messaging
            .process(ModuleRequest {
                message: plan.request(),
                intent: &intent,
                context: ctx,
                metadata: &send_metadata,
            })
            .await;

        match outcome {
            Ok(response) => {
                plan.mark_executed()?;
                let mut delta = response.delta.clearing_pending_plan();
                delta.last_intent = Some(IntentKind::SendMessage);
                Ok(Turn::new(response.text, delta))
            }
            Err(e) => {
                error!(plan = ?plan.id(), error = %e, "send step failed");
                plan.cancel()?;
                Ok(Turn::new(
                    format!("I couldn't send the message to {}.", contact),
                    StateDelta::new().clearing_pending_plan(),
                ))
            }
        }
    }

    async fn compose_text(&self, plan: &ExecutionPlan) -> Result<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| AssistError::Generation("no generator configured".into()))?;

        let mut system = format!(
            "You are {}, writing a message on the user's behalf to {}.",
            self.config.assistant_name,
            plan.target_contact()
        );
        let style = plan.style().instructions();
        if !style.is_empty() {
            system.push(' ');
            system.push_str(&style);
        }
        system.push_str(" Reply with the message text only, without a title or explanation.");

        let generation = generator
            .generate(&system, &[ChatMessage::user(plan.request())])
            .await?;
        let text: String = generation.text.trim().chars().take(MAX_COMPOSED_CHARS).collect();
        if text.is_empty() {
            return Err(AssistError::EmptyGeneration);
        }
        Ok(text)
    }

    fn accept_suggestion(&self, suggestion: &SuggestedSend) -> Result<Turn> {
        let tone = suggestion
            .tone
            .as_deref()
            .unwrap_or(&self.config.autopilot.default_tone);
        let mut plan =
            ExecutionPlan::compose_and_send(&suggestion.contact, format!("write a {} message", tone));
        plan.request_confirmation()?;

        let delta = StateDelta {
            clear_suggested_send: true,
            ..StateDelta::new().with_pending_plan(plan.clone())
        };
        Ok(Turn::new(plan.confirmation_prompt(), delta))
    }

    // === CONTACTS ===

    /// Swap the contact slot for its directory entry, or return the
    /// clarifying question to ask instead
    async fn resolve_contact(&self, intent: &mut Intent) -> std::result::Result<(), String> {
        let Some(directory) = &self.directory else {
            return Ok(());
        };
        if !intent.kind.carries_contact() {
            return Ok(());
        }
        let Some(name) = intent.contact().map(str::to_string) else {
            return Ok(());
        };

        let contacts = match directory.contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "contact directory unavailable, keeping spoken name");
                return Ok(());
            }
        };

        match self.resolver.resolve(&name, &contacts) {
            Resolution::Match { contact, score } => {
                debug!(query = %name, contact = %contact.display_name, score, "contact resolved");
                intent.entities.insert(Slot::Contact, contact.display_name);
                intent.entities.insert(Slot::ContactId, contact.id);
                Ok(())
            }
            Resolution::Ambiguous(options) => Err(format!(
                "I found more than one contact matching \"{}\": {}. Which one did you mean?",
                name,
                join_names(&options, ", ")
            )),
            Resolution::NoMatch { suggestions } if !suggestions.is_empty() => Err(format!(
                "I couldn't find \"{}\". Did you mean {}?",
                name,
                join_names(&suggestions, " or ")
            )),
            Resolution::NoMatch { .. } => {
                Err(format!("I couldn't find a contact named \"{}\".", name))
            }
        }
    }

    fn two_monitor_targets(&self, message: &str) -> Option<(String, String)> {
        let caps = self.monitor_pair.captures(message)?;
        let first = caps.get(1)?.as_str();
        let second = caps.get(2)?.as_str();
        let is_name = |w: &str| !NOT_A_NAME.contains(&w.to_lowercase().as_str());
        (is_name(first) && is_name(second)).then(|| (first.to_string(), second.to_string()))
    }

    // === ROUTING ===

    async fn route(
        &self,
        message: &str,
        intent: Intent,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
    ) -> Turn {
        let kind = intent.kind;
        let Some(target) = policy::route(kind) else {
            return Turn::new(
                policy::capabilities(&self.config.assistant_name),
                StateDelta::new().with_last_intent(kind),
            );
        };

        let module_kind = if self.modules.contains(target) {
            target
        } else {
            debug!(module = target.as_str(), "module not registered, using conversation");
            ModuleKind::Conversation
        };
        let Some(module) = self.modules.get(module_kind) else {
            warn!(kind = kind.as_str(), "no module available");
            return Turn::reply(UNAVAILABLE);
        };

        let outcome = module
            .process(ModuleRequest {
                message,
                intent: &intent,
                context: ctx,
                metadata,
            })
            .await;

        match outcome {
            Ok(response) => Turn::new(response.text, response.delta.with_last_intent(kind)),
            Err(e) => {
                error!(module = module_kind.as_str(), error = %e, "module failed");
                self.fallback(message, ctx, metadata, module_kind).await
            }
        }
    }

    /// One retry through conversation, then a generic apology
    async fn fallback(
        &self,
        message: &str,
        ctx: &ContextSnapshot,
        metadata: &Metadata,
        failed: ModuleKind,
    ) -> Turn {
        if failed != ModuleKind::Conversation {
            if let Some(conversation) = self.modules.get(ModuleKind::Conversation) {
                let intent = Intent::conversation();
                let outcome = conversation
                    .process(ModuleRequest {
                        message,
                        intent: &intent,
                        context: ctx,
                        metadata,
                    })
                    .await;
                match outcome {
                    Ok(response) => {
                        return Turn::new(
                            response.text,
                            response.delta.with_last_intent(IntentKind::Conversation),
                        )
                    }
                    Err(e) => error!(error = %e, "conversation fallback failed"),
                }
            }
        }
        Turn::reply(APOLOGY)
    }

    async fn remember(&self, message: &str, response: &str, label: &str) {
        if let Some(memory) = &self.memory {
            if let Err(e) = memory.save_turn(message, response, label).await {
                warn!(error = %e, "failed to save turn");
            }
        }
    }
}

fn join_names(contacts: &[Contact], separator: &str) -> String {
    contacts
        .iter()
        .map(|c| c.display_name.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_compose_request_builds_plan() {
        let turn = orchestrator()
            .process("send Ana a message introducing myself", &ContextSnapshot::default())
            .await
            .unwrap();

        assert!(turn.response.ends_with("Shall I proceed?"));
        let plan = turn.delta.pending_plan.unwrap();
        assert!(plan.is_awaiting());
        assert_eq!(plan.target_contact(), "Ana");
    }

    #[tokio::test]
    async fn test_stop_phrase_clears_soft_prompts() {
        let turn = orchestrator()
            .process("stop", &ContextSnapshot::default())
            .await
            .unwrap();
        assert_eq!(turn.response, STOPPED);
        assert!(turn.delta.clear_suggested_send);
        assert!(turn.delta.clear_pending_confirmation);
    }

    #[tokio::test]
    async fn test_send_without_recipient_asks() {
        let turn = orchestrator()
            .process_classified(
                "send a message",
                Intent::new(IntentKind::SendMessage, 0.85),
                &ContextSnapshot::default(),
            )
            .await
            .unwrap();
        assert_eq!(turn.response, ASK_RECIPIENT);
        assert!(turn.delta.is_empty());
    }

    #[tokio::test]
    async fn test_capabilities_answered_without_modules() {
        let turn = orchestrator()
            .process_classified(
                "what can you do",
                Intent::new(IntentKind::Capabilities, 0.9),
                &ContextSnapshot::default(),
            )
            .await
            .unwrap();
        assert!(turn.response.starts_with("Parley can help with"));
        assert_eq!(turn.delta.last_intent, Some(IntentKind::Capabilities));
    }

    #[tokio::test]
    async fn test_no_modules_is_unavailable_not_error() {
        let turn = orchestrator()
            .process_classified(
                "hello",
                Intent::new(IntentKind::Greeting, 0.9),
                &ContextSnapshot::default(),
            )
            .await
            .unwrap();
        assert_eq!(turn.response, UNAVAILABLE);
    }

    #[derive(Default)]
    struct LabelMemory {
        labels: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl MemoryStore for LabelMemory {
        async fn save_turn(&self, _message: &str, _response: &str, label: &str) -> Result<()> {
            self.labels.lock().unwrap().push(label.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_turn_is_still_remembered() {
        let memory = Arc::new(LabelMemory::default());
        let orch = orchestrator().with_memory(memory.clone());
        let failure = Err(AssistError::InvalidPlanTransition {
            from: crate::plan::PlanStatus::Executed,
            action: "cancel",
        });

        let result = orch.settle("no", &ContextSnapshot::default(), failure).await;

        assert!(matches!(result, Err(AssistError::InvalidPlanTransition { .. })));
        assert_eq!(memory.labels.lock().unwrap().as_slice(), &["error".to_string()]);
    }

    #[tokio::test]
    async fn test_settled_turn_clears_stale_suggestion() {
        let memory = Arc::new(LabelMemory::default());
        let orch = orchestrator().with_memory(memory.clone());
        let ctx = ContextSnapshot {
            suggested_send: Some(SuggestedSend {
                contact: "Ana".into(),
                tone: None,
            }),
            ..ContextSnapshot::default()
        };

        let turn = orch
            .settle("hmm", &ctx, Ok((Turn::reply("Okay."), "conversation".into())))
            .await
            .unwrap();

        assert!(turn.delta.clear_suggested_send);
        assert_eq!(memory.labels.lock().unwrap().as_slice(), &["conversation".to_string()]);
    }

    #[test]
    fn test_two_monitor_targets() {
        let orch = orchestrator();
        assert_eq!(
            orch.two_monitor_targets("monitor Ana and Bia"),
            Some(("Ana".to_string(), "Bia".to_string()))
        );
        assert_eq!(orch.two_monitor_targets("monitor Ana and reply to her"), None);
        assert_eq!(orch.two_monitor_targets("monitor Ana"), None);
    }
}
