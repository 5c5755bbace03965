//! Conversation context
//!
//! `ContextManager` owns everything that outlives a single turn. Consumers
//! never hold on to it; they receive a `ContextSnapshot` at the start of a
//! turn and describe what should change through a `StateDelta`.

pub mod manager;

pub use manager::ContextManager;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contacts::normalize;
use crate::core::types::{ChatMessage, MessageSource, Role};
use crate::intent::IntentKind;
use crate::orchestrator::delta::{PendingConfirmation, StateDelta, SuggestedSend};
use crate::plan::ExecutionPlan;

/// One message in the rolling history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub source: MessageSource,
}

/// Most recent message exchanged with a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub contact: String,
    pub text: String,
    pub from_me: bool,
    pub timestamp: DateTime<Utc>,
}

/// An auto-reply registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotEntry {
    pub contact: String,
    pub tone: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AutopilotEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn minutes_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }
}

/// Read-only view of the context at the start of a turn
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    pub history: Vec<HistoryEntry>,
    pub last_intent: Option<IntentKind>,
    pub last_contact: Option<String>,
    /// Oldest first; the last entry is the active target
    pub monitored_contacts: Vec<String>,
    pub entities: AHashMap<String, String>,
    pub active_flows: Vec<String>,
    pub pending_plan: Option<ExecutionPlan>,
    pub pending_confirmation: Option<PendingConfirmation>,
    pub suggested_send: Option<SuggestedSend>,
    /// Live (unexpired) auto-reply registrations
    pub autopilot: Vec<AutopilotEntry>,
    pub last_messages: Vec<LastMessage>,
    pub session: AHashMap<String, serde_json::Value>,
    pub message_count: usize,
}

impl ContextSnapshot {
    pub fn last_monitored(&self) -> Option<&str> {
        self.monitored_contacts.last().map(String::as_str)
    }

    pub fn is_monitoring(&self, contact: &str) -> bool {
        let key = normalize(contact);
        self.monitored_contacts.iter().any(|c| normalize(c) == key)
    }

    pub fn autopilot_for(&self, contact: &str) -> Option<&AutopilotEntry> {
        let key = normalize(contact);
        self.autopilot.iter().find(|e| normalize(&e.contact) == key)
    }

    pub fn last_message_with(&self, contact: &str) -> Option<&LastMessage> {
        let key = normalize(contact);
        self.last_messages.iter().find(|m| normalize(&m.contact) == key)
    }

    /// The last `n` history messages as generator input
    pub fn recent_messages(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.history.len().saturating_sub(n);
        self.history
            .iter()
            .skip(skip)
            .map(|e| ChatMessage {
                role: e.role,
                content: e.text.clone(),
            })
            .collect()
    }

    /// Fold a delta into this view so a later clause of the same turn sees it
    pub fn absorb(&mut self, delta: &StateDelta) {
        if let Some(contact) = &delta.last_contact {
            self.last_contact = Some(contact.clone());
        }
        if let Some(contact) = &delta.remove_monitored_contact {
            let key = normalize(contact);
            self.monitored_contacts.retain(|c| normalize(c) != key);
        }
        if let Some(contact) = &delta.monitored_contact {
            let key = normalize(contact);
            self.monitored_contacts.retain(|c| normalize(c) != key);
            self.monitored_contacts.push(contact.clone());
        }
        if let Some(kind) = delta.last_intent {
            self.last_intent = Some(kind);
        }
        if delta.clear_pending_plan {
            self.pending_plan = None;
        }
        if let Some(plan) = &delta.pending_plan {
            self.pending_plan = Some(plan.clone());
        }
        if delta.clear_suggested_send {
            self.suggested_send = None;
        }
        if let Some(suggestion) = &delta.set_suggested_send {
            self.suggested_send = Some(suggestion.clone());
        }
        if delta.clear_pending_confirmation {
            self.pending_confirmation = None;
        }
        if let Some(pending) = &delta.pending_confirmation {
            self.pending_confirmation = Some(pending.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_updates_contacts() {
        let mut snapshot = ContextSnapshot::default();
        snapshot.monitored_contacts = vec!["Ana".into()];

        let delta = StateDelta {
            last_contact: Some("Paulo".into()),
            monitored_contact: Some("Paulo".into()),
            remove_monitored_contact: Some("ana".into()),
            ..StateDelta::default()
        };
        snapshot.absorb(&delta);

        assert_eq!(snapshot.last_contact.as_deref(), Some("Paulo"));
        assert_eq!(snapshot.monitored_contacts, vec!["Paulo".to_string()]);
        assert_eq!(snapshot.last_monitored(), Some("Paulo"));
    }

    #[test]
    fn test_recent_messages_takes_tail() {
        let mut snapshot = ContextSnapshot::default();
        for (i, role) in [Role::User, Role::Assistant, Role::User].into_iter().enumerate() {
            snapshot.history.push(HistoryEntry {
                role,
                text: format!("m{}", i),
                timestamp: Utc::now(),
                source: MessageSource::Text,
            });
        }
        let recent = snapshot.recent_messages(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0], ChatMessage::assistant("m1"));
        assert_eq!(recent[1], ChatMessage::user("m2"));
    }

    #[test]
    fn test_lookups_ignore_case_and_accents() {
        let mut snapshot = ContextSnapshot::default();
        snapshot.monitored_contacts = vec!["Júlia".into()];
        assert!(snapshot.is_monitoring("julia"));
        assert!(!snapshot.is_monitoring("ana"));
    }
}
