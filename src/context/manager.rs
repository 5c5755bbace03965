//! Context manager with idle expiry and bounded memory
//!
//! Short-lived state (entities, flows, last contact, monitored contacts,
//! pending prompts) is purged after an idle window. Per-contact last
//! messages and autopilot registrations survive the purge; autopilot
//! entries expire on their own clock.

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

use crate::contacts::normalize;
use crate::context::{AutopilotEntry, ContextSnapshot, HistoryEntry, LastMessage};
use crate::core::config::{AutopilotConfig, ContextConfig, EngineConfig};
use crate::core::error::Result;
use crate::core::types::{MessageSource, Role};
use crate::intent::IntentKind;
use crate::orchestrator::delta::{PendingConfirmation, StateDelta, SuggestedSend};
use crate::plan::ExecutionPlan;

/// Flows opened and closed by `apply`
pub const PLAN_FLOW: &str = "compose_plan";
pub const SUGGESTION_FLOW: &str = "suggested_send";
pub const CONFIRMATION_FLOW: &str = "confirmation";

#[derive(Debug, Clone)]
pub struct ContextManager {
    config: ContextConfig,
    autopilot_config: AutopilotConfig,
    history: VecDeque<HistoryEntry>,
    message_count: usize,
    last_interaction: DateTime<Utc>,
    // short-lived
    last_intent: Option<IntentKind>,
    last_contact: Option<String>,
    monitored: Vec<String>,
    entities: AHashMap<String, String>,
    flows: AHashMap<String, DateTime<Utc>>,
    pending_plan: Option<ExecutionPlan>,
    pending_confirmation: Option<PendingConfirmation>,
    suggested_send: Option<SuggestedSend>,
    // long-lived
    last_messages: AHashMap<String, LastMessage>,
    last_message_order: VecDeque<String>,
    autopilot: AHashMap<String, AutopilotEntry>,
    session: AHashMap<String, serde_json::Value>,
}

/// What survives a restart
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedContext {
    monitored_contacts: Vec<String>,
    /// Least recently updated first
    last_messages: Vec<LastMessage>,
    autopilot: Vec<AutopilotEntry>,
    session: AHashMap<String, serde_json::Value>,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(ContextConfig::default(), AutopilotConfig::default())
    }
}

impl ContextManager {
    pub fn new(config: ContextConfig, autopilot_config: AutopilotConfig) -> Self {
        Self {
            config,
            autopilot_config,
            history: VecDeque::new(),
            message_count: 0,
            last_interaction: Utc::now(),
            last_intent: None,
            last_contact: None,
            monitored: Vec::new(),
            entities: AHashMap::new(),
            flows: AHashMap::new(),
            pending_plan: None,
            pending_confirmation: None,
            suggested_send: None,
            last_messages: AHashMap::new(),
            last_message_order: VecDeque::new(),
            autopilot: AHashMap::new(),
            session: AHashMap::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.context.clone(), config.autopilot.clone())
    }

    // === HISTORY ===

    pub fn add_message(&mut self, role: Role, text: impl Into<String>, source: MessageSource) {
        self.add_message_at(role, text, source, Utc::now());
    }

    /// Record a message, purging short-lived state first if the idle window
    /// elapsed since the previous one
    pub fn add_message_at(
        &mut self,
        role: Role,
        text: impl Into<String>,
        source: MessageSource,
        now: DateTime<Utc>,
    ) {
        if now - self.last_interaction > Duration::minutes(self.config.idle_window_minutes) {
            self.purge_short_lived();
        }
        self.last_interaction = now;

        self.history.push_back(HistoryEntry {
            role,
            text: text.into(),
            timestamp: now,
            source,
        });
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
        self.message_count += 1;
    }

    fn purge_short_lived(&mut self) {
        info!("context idle window elapsed, clearing short-lived state");
        self.last_intent = None;
        self.last_contact = None;
        self.monitored.clear();
        self.entities.clear();
        self.flows.clear();
        self.pending_plan = None;
        self.pending_confirmation = None;
        self.suggested_send = None;
    }

    // === CONTACTS ===

    pub fn set_last_contact(&mut self, contact: impl Into<String>) {
        let contact = contact.into();
        debug!(contact = %contact, "last contact");
        self.last_contact = Some(contact);
    }

    pub fn last_contact(&self) -> Option<&str> {
        self.last_contact.as_deref()
    }

    /// Add (or refresh) a monitored contact; it becomes the active target
    pub fn add_monitored_contact(&mut self, contact: impl Into<String>) {
        let contact = contact.into();
        let key = normalize(&contact);
        self.monitored.retain(|c| normalize(c) != key);
        debug!(contact = %contact, "monitoring");
        self.monitored.push(contact);
    }

    pub fn remove_monitored_contact(&mut self, contact: &str) -> bool {
        let key = normalize(contact);
        let before = self.monitored.len();
        self.monitored.retain(|c| normalize(c) != key);
        before != self.monitored.len()
    }

    pub fn monitored_contacts(&self) -> &[String] {
        &self.monitored
    }

    pub fn set_last_intent(&mut self, kind: IntentKind) {
        self.last_intent = Some(kind);
    }

    // === PENDING PROMPTS ===

    pub fn set_pending_plan(&mut self, plan: ExecutionPlan) {
        self.pending_plan = Some(plan);
    }

    /// Idempotent
    pub fn clear_pending_plan(&mut self) {
        self.pending_plan = None;
    }

    pub fn pending_plan(&self) -> Option<&ExecutionPlan> {
        self.pending_plan.as_ref()
    }

    pub fn set_pending_confirmation(&mut self, pending: PendingConfirmation) {
        self.pending_confirmation = Some(pending);
    }

    pub fn clear_pending_confirmation(&mut self) {
        self.pending_confirmation = None;
    }

    pub fn set_suggested_send(&mut self, suggestion: SuggestedSend) {
        self.suggested_send = Some(suggestion);
    }

    pub fn clear_suggested_send(&mut self) {
        self.suggested_send = None;
    }

    // === LAST MESSAGES ===

    pub fn update_last_message(&mut self, contact: &str, text: &str, from_me: bool) {
        self.update_last_message_at(contact, text, from_me, Utc::now());
    }

    /// Record the latest message with `contact`, evicting the least recently
    /// updated contact when over capacity
    pub fn update_last_message_at(
        &mut self,
        contact: &str,
        text: &str,
        from_me: bool,
        now: DateTime<Utc>,
    ) {
        let key = normalize(contact);
        if self.last_messages.contains_key(&key) {
            self.last_message_order.retain(|k| *k != key);
        }
        self.last_message_order.push_back(key.clone());
        self.last_messages.insert(
            key,
            LastMessage {
                contact: contact.to_string(),
                text: text.to_string(),
                from_me,
                timestamp: now,
            },
        );

        while self.last_message_order.len() > self.config.last_message_capacity {
            if let Some(oldest) = self.last_message_order.pop_front() {
                self.last_messages.remove(&oldest);
            }
        }
    }

    pub fn last_message(&self, contact: &str) -> Option<&LastMessage> {
        self.last_messages.get(&normalize(contact))
    }

    // === AUTOPILOT ===

    pub fn enable_autopilot(&mut self, contact: &str, tone: Option<&str>, ttl_minutes: Option<i64>) {
        self.enable_autopilot_at(contact, tone, ttl_minutes, Utc::now());
    }

    pub fn enable_autopilot_at(
        &mut self,
        contact: &str,
        tone: Option<&str>,
        ttl_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) {
        let ttl = ttl_minutes
            .filter(|m| *m > 0)
            .unwrap_or(self.autopilot_config.ttl_minutes);
        let tone = tone
            .map(str::to_string)
            .unwrap_or_else(|| self.autopilot_config.default_tone.clone());
        info!(contact, tone = %tone, ttl, "autopilot enabled");
        self.autopilot.insert(
            normalize(contact),
            AutopilotEntry {
                contact: contact.to_string(),
                tone,
                created_at: now,
                expires_at: now + Duration::minutes(ttl),
            },
        );
    }

    pub fn disable_autopilot(&mut self, contact: &str) -> bool {
        let removed = self.autopilot.remove(&normalize(contact)).is_some();
        if removed {
            info!(contact, "autopilot disabled");
        }
        removed
    }

    pub fn disable_all_autopilot(&mut self) -> usize {
        let count = self.autopilot.len();
        self.autopilot.clear();
        count
    }

    pub fn update_autopilot_tone(&mut self, contact: &str, tone: &str) -> bool {
        match self.autopilot.get_mut(&normalize(contact)) {
            Some(entry) => {
                entry.tone = tone.to_string();
                true
            }
            None => false,
        }
    }

    /// Live registration for `contact`; expired entries are dropped on read
    pub fn autopilot_at(&mut self, contact: &str, now: DateTime<Utc>) -> Option<&AutopilotEntry> {
        let key = normalize(contact);
        if self.autopilot.get(&key).is_some_and(|e| e.is_expired(now)) {
            self.autopilot.remove(&key);
        }
        self.autopilot.get(&key)
    }

    pub fn is_autopilot_enabled(&mut self, contact: &str) -> bool {
        self.autopilot_at(contact, Utc::now()).is_some()
    }

    // === SESSION / ENTITIES / FLOWS ===

    pub fn set_session(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.session.insert(key.into(), value);
    }

    pub fn get_session(&self, key: &str) -> Option<&serde_json::Value> {
        self.session.get(key)
    }

    pub fn add_entity(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entities.insert(name.into(), value.into());
    }

    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }

    pub fn start_flow(&mut self, name: impl Into<String>) {
        self.flows.insert(name.into(), Utc::now());
    }

    pub fn end_flow(&mut self, name: &str) -> bool {
        self.flows.remove(name).is_some()
    }

    /// Forget everything, long-lived state included
    pub fn clear(&mut self) {
        self.purge_short_lived();
        self.history.clear();
        self.message_count = 0;
        self.last_messages.clear();
        self.last_message_order.clear();
        self.autopilot.clear();
        self.session.clear();
    }

    // === AGGREGATE ===

    pub fn get_context(&mut self) -> ContextSnapshot {
        self.get_context_at(Utc::now())
    }

    pub fn get_context_at(&mut self, now: DateTime<Utc>) -> ContextSnapshot {
        self.autopilot.retain(|_, e| !e.is_expired(now));

        let mut autopilot: Vec<AutopilotEntry> = self.autopilot.values().cloned().collect();
        autopilot.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut flows: Vec<(String, DateTime<Utc>)> =
            self.flows.iter().map(|(k, v)| (k.clone(), *v)).collect();
        flows.sort_by(|a, b| a.1.cmp(&b.1));

        ContextSnapshot {
            history: self.history.iter().cloned().collect(),
            last_intent: self.last_intent,
            last_contact: self.last_contact.clone(),
            monitored_contacts: self.monitored.clone(),
            entities: self.entities.clone(),
            active_flows: flows.into_iter().map(|(k, _)| k).collect(),
            pending_plan: self.pending_plan.clone(),
            pending_confirmation: self.pending_confirmation.clone(),
            suggested_send: self.suggested_send.clone(),
            autopilot,
            last_messages: self
                .last_message_order
                .iter()
                .filter_map(|k| self.last_messages.get(k).cloned())
                .collect(),
            session: self.session.clone(),
            message_count: self.message_count,
        }
    }

    /// Apply every key present in `delta`
    ///
    /// Clears run before sets, so a turn that drops an old plan and parks a
    /// new one ends with the new one.
    pub fn apply(&mut self, delta: &StateDelta) {
        self.apply_at(delta, Utc::now());
    }

    pub fn apply_at(&mut self, delta: &StateDelta, now: DateTime<Utc>) {
        if delta.clear_pending_plan {
            self.clear_pending_plan();
            self.end_flow(PLAN_FLOW);
        }
        if delta.clear_suggested_send {
            self.clear_suggested_send();
            self.end_flow(SUGGESTION_FLOW);
        }
        if delta.clear_pending_confirmation {
            self.clear_pending_confirmation();
            self.end_flow(CONFIRMATION_FLOW);
        }

        if let Some(contact) = &delta.last_contact {
            self.set_last_contact(contact.clone());
            self.add_entity("contact", contact.clone());
        }
        if let Some(contact) = &delta.remove_monitored_contact {
            self.remove_monitored_contact(contact);
        }
        if let Some(contact) = &delta.monitored_contact {
            self.add_monitored_contact(contact.clone());
        }
        if let Some(kind) = delta.last_intent {
            self.set_last_intent(kind);
        }
        if let (Some(text), Some(contact)) = (&delta.sent_text, &delta.last_contact) {
            self.update_last_message_at(contact, text, true, now);
            self.add_entity("sent_text", text.clone());
        }

        if let Some(request) = &delta.enable_autopilot {
            self.enable_autopilot_at(
                &request.contact,
                request.tone.as_deref(),
                request.ttl_minutes,
                now,
            );
        }
        if let Some(target) = &delta.disable_autopilot {
            match &target.contact {
                Some(contact) => {
                    self.disable_autopilot(contact);
                }
                None => {
                    self.disable_all_autopilot();
                }
            }
        }
        if let Some(update) = &delta.update_autopilot_tone {
            self.update_autopilot_tone(&update.contact, &update.tone);
        }

        if let Some(draft) = &delta.draft {
            match serde_json::to_value(draft) {
                Ok(value) => self.set_session("draft", value),
                Err(e) => tracing::warn!(error = %e, "could not store draft"),
            }
        }
        if let Some(plan) = &delta.pending_plan {
            self.set_pending_plan(plan.clone());
            self.flows.insert(PLAN_FLOW.into(), now);
        }
        if let Some(suggestion) = &delta.set_suggested_send {
            self.set_suggested_send(suggestion.clone());
            self.flows.insert(SUGGESTION_FLOW.into(), now);
        }
        if let Some(pending) = &delta.pending_confirmation {
            self.set_pending_confirmation(pending.clone());
            self.flows.insert(CONFIRMATION_FLOW.into(), now);
        }
    }

    // === PERSISTENCE ===

    /// Write long-lived state as JSON (via a temp file, then rename)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let state = PersistedContext {
            monitored_contacts: self.monitored.clone(),
            last_messages: self
                .last_message_order
                .iter()
                .filter_map(|k| self.last_messages.get(k).cloned())
                .collect(),
            autopilot: self.autopilot.values().cloned().collect(),
            session: self.session.clone(),
        };
        let json = serde_json::to_string_pretty(&state)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "context saved");
        Ok(())
    }

    /// Restore long-lived state; a missing file is not an error
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }
        let state: PersistedContext = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let now = Utc::now();

        for contact in state.monitored_contacts {
            self.add_monitored_contact(contact);
        }
        for msg in state.last_messages {
            self.update_last_message_at(&msg.contact, &msg.text, msg.from_me, msg.timestamp);
        }
        for entry in state.autopilot.into_iter().filter(|e| !e.is_expired(now)) {
            self.autopilot.insert(normalize(&entry.contact), entry);
        }
        self.session.extend(state.session);
        info!(path = %path.display(), "context restored");
        Ok(())
    }
}
