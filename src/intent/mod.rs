//! Intent classification
//!
//! Turns free-form text plus a context snapshot into a typed `Intent`.
//! Rule-based: ordered regex tables, a handful of fast paths that run first,
//! keyword containment as a coarse fallback, and plain conversation last.

pub mod classifier;
pub mod compound;
pub mod entities;
pub mod patterns;

pub use classifier::IntentClassifier;
pub use compound::CompoundSplitter;
pub use entities::{backfill_contact, clean_contact, ContactSlot, TargetExtractor};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every intent the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    // Messaging
    SendMessage,
    CheckMessages,
    ReadHistory,
    Monitor,
    MonitorDisable,
    MonitorStatus,
    Reply,
    AutopilotEnable,
    AutopilotDisable,
    AutopilotStatus,
    AutopilotSetTone,
    // Assistant
    Capabilities,
    ConversationQuestion,
    // Calendar
    Reminder,
    Alarm,
    Schedule,
    // Information
    Translation,
    Search,
    Weather,
    News,
    // Local machine
    FileOperation,
    SystemInfo,
    SystemCommand,
    AppControl,
    // Small talk
    Greeting,
    Thanks,
    Farewell,
    // Secondary categories
    Sentiment,
    Productivity,
    Backup,
    Automation,
    Conversation,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::SendMessage => "send_message",
            IntentKind::CheckMessages => "check_messages",
            IntentKind::ReadHistory => "read_history",
            IntentKind::Monitor => "monitor",
            IntentKind::MonitorDisable => "monitor_disable",
            IntentKind::MonitorStatus => "monitor_status",
            IntentKind::Reply => "reply",
            IntentKind::AutopilotEnable => "autopilot_enable",
            IntentKind::AutopilotDisable => "autopilot_disable",
            IntentKind::AutopilotStatus => "autopilot_status",
            IntentKind::AutopilotSetTone => "autopilot_set_tone",
            IntentKind::Capabilities => "capabilities",
            IntentKind::ConversationQuestion => "conversation_question",
            IntentKind::Reminder => "reminder",
            IntentKind::Alarm => "alarm",
            IntentKind::Schedule => "schedule",
            IntentKind::Translation => "translation",
            IntentKind::Search => "search",
            IntentKind::Weather => "weather",
            IntentKind::News => "news",
            IntentKind::FileOperation => "file_operation",
            IntentKind::SystemInfo => "system_info",
            IntentKind::SystemCommand => "system_command",
            IntentKind::AppControl => "app_control",
            IntentKind::Greeting => "greeting",
            IntentKind::Thanks => "thanks",
            IntentKind::Farewell => "farewell",
            IntentKind::Sentiment => "sentiment",
            IntentKind::Productivity => "productivity",
            IntentKind::Backup => "backup",
            IntentKind::Automation => "automation",
            IntentKind::Conversation => "conversation",
        }
    }

    /// Plain-language description used in confirmation questions
    pub fn describe(&self) -> &'static str {
        match self {
            IntentKind::SendMessage => "send a message",
            IntentKind::CheckMessages => "check your messages",
            IntentKind::ReadHistory => "read a chat history",
            IntentKind::Monitor => "monitor a chat",
            IntentKind::MonitorDisable => "stop monitoring a chat",
            IntentKind::MonitorStatus => "list the chats I'm monitoring",
            IntentKind::Reply => "reply to a message",
            IntentKind::AutopilotEnable => "start auto-replying to a contact",
            IntentKind::AutopilotDisable => "stop auto-replying",
            IntentKind::AutopilotStatus => "show the auto-reply status",
            IntentKind::AutopilotSetTone => "change the auto-reply tone",
            IntentKind::Capabilities => "list what I can do",
            IntentKind::ConversationQuestion => "recall our conversation",
            IntentKind::Reminder => "set a reminder",
            IntentKind::Alarm => "set an alarm",
            IntentKind::Schedule => "work with your calendar",
            IntentKind::Translation => "translate something",
            IntentKind::Search => "search the web",
            IntentKind::Weather => "check the weather",
            IntentKind::News => "get the news",
            IntentKind::FileOperation => "work with your files",
            IntentKind::SystemInfo => "check system information",
            IntentKind::SystemCommand => "run a system command",
            IntentKind::AppControl => "control an application",
            IntentKind::Greeting | IntentKind::Thanks | IntentKind::Farewell => "chat",
            IntentKind::Sentiment => "talk about how you feel",
            IntentKind::Productivity => "help with your tasks",
            IntentKind::Backup => "run a backup",
            IntentKind::Automation => "set up an automation",
            IntentKind::Conversation => "chat",
        }
    }

    /// System-control kinds never match an interrogative sentence
    pub fn is_system_control(&self) -> bool {
        matches!(self, IntentKind::SystemCommand | IntentKind::AppControl)
    }

    /// Kinds whose `contact` slot names a person
    pub fn carries_contact(&self) -> bool {
        matches!(
            self,
            IntentKind::SendMessage
                | IntentKind::CheckMessages
                | IntentKind::ReadHistory
                | IntentKind::Monitor
                | IntentKind::MonitorDisable
                | IntentKind::MonitorStatus
                | IntentKind::Reply
                | IntentKind::AutopilotEnable
                | IntentKind::AutopilotDisable
                | IntentKind::AutopilotStatus
                | IntentKind::AutopilotSetTone
        )
    }

    /// Kinds where a missing or pronoun contact is filled from context
    pub fn backfills_contact(&self) -> bool {
        matches!(
            self,
            IntentKind::SendMessage
                | IntentKind::ReadHistory
                | IntentKind::Monitor
                | IntentKind::MonitorDisable
                | IntentKind::Reply
                | IntentKind::AutopilotEnable
                | IntentKind::AutopilotSetTone
        )
    }
}

/// Named entity slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Contact,
    ContactId,
    Content,
    Query,
    Tone,
    Task,
    Time,
    Target,
    App,
    Value,
    Raw,
}

pub type Entities = BTreeMap<Slot, String>;

/// A classified utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub confidence: f32,
    pub entities: Entities,
    pub raw_match: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            entities: Entities::new(),
            raw_match: None,
        }
    }

    /// Fallback for anything the rules don't recognise
    pub fn conversation() -> Self {
        Self::new(IntentKind::Conversation, 0.5)
    }

    pub fn with_entity(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.entities.insert(slot, value.into());
        self
    }

    pub fn with_raw_match(mut self, raw: impl Into<String>) -> Self {
        self.raw_match = Some(raw.into());
        self
    }

    pub fn entity(&self, slot: Slot) -> Option<&str> {
        self.entities.get(&slot).map(String::as_str)
    }

    pub fn contact(&self) -> Option<&str> {
        self.entity(Slot::Contact)
    }

    pub fn content(&self) -> Option<&str> {
        self.entity(Slot::Content)
    }
}
