//! State deltas: the only way a turn changes the context
//!
//! Modules and the orchestrator describe changes; the context manager
//! applies them once the whole turn has been computed.

use serde::{Deserialize, Serialize};

use crate::intent::{Intent, IntentKind};
use crate::plan::ExecutionPlan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotRequest {
    pub contact: String,
    pub tone: Option<String>,
    pub ttl_minutes: Option<i64>,
}

/// `contact: None` disables every registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopilotTarget {
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneUpdate {
    pub contact: String,
    pub tone: String,
}

/// Text prepared for a contact but not sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub to: String,
    pub text: String,
}

/// A soft "want me to send something to X?" offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSend {
    pub contact: String,
    pub tone: Option<String>,
}

/// A low-confidence intent parked until the user says yes or no
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub intent: Intent,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateDelta {
    pub last_contact: Option<String>,
    pub monitored_contact: Option<String>,
    pub remove_monitored_contact: Option<String>,
    pub last_intent: Option<IntentKind>,
    pub sent_text: Option<String>,
    pub enable_autopilot: Option<AutopilotRequest>,
    pub disable_autopilot: Option<AutopilotTarget>,
    pub update_autopilot_tone: Option<ToneUpdate>,
    pub draft: Option<Draft>,
    pub pending_plan: Option<ExecutionPlan>,
    pub clear_pending_plan: bool,
    pub set_suggested_send: Option<SuggestedSend>,
    pub clear_suggested_send: bool,
    pub pending_confirmation: Option<PendingConfirmation>,
    pub clear_pending_confirmation: bool,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_last_contact(mut self, contact: impl Into<String>) -> Self {
        self.last_contact = Some(contact.into());
        self
    }

    pub fn with_last_intent(mut self, kind: IntentKind) -> Self {
        self.last_intent = Some(kind);
        self
    }

    pub fn with_pending_plan(mut self, plan: ExecutionPlan) -> Self {
        self.pending_plan = Some(plan);
        self
    }

    pub fn clearing_pending_plan(mut self) -> Self {
        self.clear_pending_plan = true;
        self
    }

    /// Overlay `other` on top of `self`; later values win, flags accumulate
    pub fn merge(&mut self, other: StateDelta) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.last_contact, other.last_contact);
        take(&mut self.monitored_contact, other.monitored_contact);
        take(&mut self.remove_monitored_contact, other.remove_monitored_contact);
        take(&mut self.last_intent, other.last_intent);
        take(&mut self.sent_text, other.sent_text);
        take(&mut self.enable_autopilot, other.enable_autopilot);
        take(&mut self.disable_autopilot, other.disable_autopilot);
        take(&mut self.update_autopilot_tone, other.update_autopilot_tone);
        take(&mut self.draft, other.draft);
        take(&mut self.pending_plan, other.pending_plan);
        take(&mut self.set_suggested_send, other.set_suggested_send);
        take(&mut self.pending_confirmation, other.pending_confirmation);
        self.clear_pending_plan |= other.clear_pending_plan;
        self.clear_suggested_send |= other.clear_suggested_send;
        self.clear_pending_confirmation |= other.clear_pending_confirmation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_later_values_win() {
        let mut first = StateDelta::new()
            .with_last_contact("Paulo")
            .with_last_intent(IntentKind::SendMessage);
        let second = StateDelta {
            monitored_contact: Some("Paulo".into()),
            last_intent: Some(IntentKind::Monitor),
            ..StateDelta::default()
        };
        first.merge(second);

        assert_eq!(first.last_contact.as_deref(), Some("Paulo"));
        assert_eq!(first.monitored_contact.as_deref(), Some("Paulo"));
        assert_eq!(first.last_intent, Some(IntentKind::Monitor));
    }

    #[test]
    fn test_merge_flags_accumulate() {
        let mut delta = StateDelta::new().clearing_pending_plan();
        delta.merge(StateDelta::default());
        assert!(delta.clear_pending_plan);
        assert!(!delta.is_empty());
        assert!(StateDelta::default().is_empty());
    }

    #[test]
    fn test_wire_keys_are_camel_case() {
        let delta = StateDelta {
            enable_autopilot: Some(AutopilotRequest {
                contact: "Ana".into(),
                tone: Some("sweet".into()),
                ttl_minutes: Some(30),
            }),
            clear_pending_plan: true,
            ..StateDelta::default()
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["enableAutopilot"]["ttlMinutes"], 30);
        assert_eq!(json["clearPendingPlan"], true);

        let parsed: StateDelta =
            serde_json::from_str(r#"{"lastContact": "Ana", "sentText": "hi"}"#).unwrap();
        assert_eq!(parsed.last_contact.as_deref(), Some("Ana"));
        assert_eq!(parsed.sent_text.as_deref(), Some("hi"));
    }
}
