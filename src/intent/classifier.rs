//! Rule-based intent classifier
//!
//! Evaluation order:
//! 1. override table (monitor / autopilot disable), 0.95
//! 2. conditional auto-reply ("when she messages, reply"), 0.9
//! 3. contact correction after a monitor request, 0.85
//! 4. send verb + message noun fast path, 0.85
//! 5. ordered main table, 0.9
//! 6. secondary categories, 0.9
//! 7. keyword containment, 0.6
//! 8. conversation, 0.5

use regex::Regex;
use tracing::debug;

use crate::context::ContextSnapshot;
use crate::core::error::Result;
use crate::intent::compound::CompoundSplitter;
use crate::intent::entities::{backfill_contact, clean_contact, ContactSlot, TargetExtractor};
use crate::intent::patterns::{self, PatternRule, KEYWORDS};
use crate::intent::{Intent, IntentKind, Slot};

const OVERRIDE_CONFIDENCE: f32 = 0.95;
const TABLE_CONFIDENCE: f32 = 0.9;
const FAST_PATH_CONFIDENCE: f32 = 0.85;
const KEYWORD_CONFIDENCE: f32 = 0.6;

/// Words after "to" that start a verb phrase or a place, never a recipient
const NOT_RECIPIENTS: &[&str] = &[
    "the", "a", "an", "my", "your", "our", "this", "that", "it", "me", "be", "do", "go", "get",
    "make", "cook", "see", "know", "find", "say", "call", "buy", "pay", "eat", "take", "bring",
    "come", "help", "learn", "use", "start", "stop", "check", "pick", "meet", "visit", "fix",
    "play", "watch", "keep", "try", "ask", "work", "school", "bed", "sleep", "read", "write",
    "send", "tell", "text", "message", "have", "let", "talk", "chat",
];

const COMMAND_VERBS: &[&str] = &[
    "send", "message", "text", "tell", "write", "read", "check", "monitor", "stop", "reply",
    "open", "search", "remind", "show", "yes", "no", "ok", "okay", "thanks", "hi", "hello",
];

pub struct IntentClassifier {
    overrides: Vec<PatternRule>,
    table: Vec<PatternRule>,
    send_rules: Vec<PatternRule>,
    secondary: Vec<PatternRule>,
    conditional: Regex,
    conditional_tone: Regex,
    send_verb: Regex,
    send_noun: Regex,
    recipient: Regex,
    self_directed: Regex,
    send_negation: Regex,
    chat_redirect: Regex,
    interrogative: Regex,
    polite_request: Regex,
    splitter: CompoundSplitter,
    targets: TargetExtractor,
}

impl IntentClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            overrides: patterns::overrides()?,
            table: patterns::table()?,
            send_rules: patterns::send_rules()?,
            secondary: patterns::secondary()?,
            conditional: Regex::new(
                r"(?i)\b(?:when|if|in\s+case|whenever)\s+(.+?)\s+(?:messages|texts|writes|calls|sends\s+(?:me\s+)?(?:a\s+)?message|replies|answers|message|text|write)\b.*?\b(?:reply|respond|answer|chat|talk|entertain|keep\s+(?:him|her|them)\s+(?:busy|company|entertained))\b",
            )?,
            conditional_tone: Regex::new(r"(?i)\bin\s+an?\s+(\w+)\s+(?:tone|way)\b")?,
            send_verb: Regex::new(r"(?i)\b(?:send|text|write|tell|ping)\b|^(?:please\s+)?message\b")?,
            send_noun: Regex::new(r"(?i)\b(?:message|msg|note)\b")?,
            recipient: Regex::new(r"(?i)\bto\s+([\p{L}']+)")?,
            self_directed: Regex::new(r"(?i)\b(?:tell|write|text|send)\s+me\b|\bhow\s+to\b")?,
            send_negation: Regex::new(
                r"(?i)\b(?:don'?t|do\s+not|never)\s+(?:want\s+(?:you\s+)?to\s+|wanna\s+)?(?:send|text|message|write)\b|\bno\s+messages?\b",
            )?,
            chat_redirect: Regex::new(
                r"(?i)\b(?:let'?s|just|i\s+want\s+to)\s+(?:chat|talk)\b|\btalk\s+(?:to|with)\s+you\b|\bforget\s+(?:about\s+)?the\s+messages?\b",
            )?,
            interrogative: Regex::new(
                r"(?i)^(?:what|how|why|which|who|when|where|can|could|would|will|is|are|do|does|did|should)\b",
            )?,
            polite_request: Regex::new(r"(?i)^(?:can|could|would|will)\s+you\b|\bplease\b")?,
            splitter: CompoundSplitter::new()?,
            targets: TargetExtractor::new()?,
        })
    }

    /// Classify `text` against the current context. Never fails.
    pub fn classify(&self, text: &str, ctx: &ContextSnapshot) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            return Intent::conversation();
        }

        if let Some(intent) = self.match_rules(&self.overrides, text, OVERRIDE_CONFIDENCE) {
            return self.finish(intent, ctx);
        }
        if let Some(intent) = self.conditional_autoreply(text) {
            return self.finish(intent, ctx);
        }
        if let Some(intent) = self.contact_correction(text, ctx) {
            return self.finish(intent, ctx);
        }
        if self.has_send_intent(text) {
            return self.finish(self.send_fast_path(text), ctx);
        }
        if let Some(intent) = self.match_rules(&self.table, text, TABLE_CONFIDENCE) {
            return self.finish(intent, ctx);
        }
        if let Some(intent) = self.match_rules(&self.secondary, text, TABLE_CONFIDENCE) {
            return self.finish(intent, ctx);
        }
        if let Some(intent) = keyword_fallback(text) {
            return self.finish(intent, ctx);
        }

        debug!(text, "no rule matched, treating as conversation");
        Intent::conversation()
    }

    /// Split a compound command into clauses
    pub fn split_compound(&self, text: &str) -> Vec<String> {
        self.splitter.split(text)
    }

    /// Contacts named as recipients of a compose request
    pub fn send_targets(&self, text: &str) -> Vec<String> {
        self.targets.extract(text)
    }

    /// Send verb plus a message noun (or "to <someone>"), not negated and
    /// not a request to just chat
    ///
    /// "tell me ...", "how to ..." and plain questions are never sends.
    pub fn has_send_intent(&self, text: &str) -> bool {
        if !self.send_verb.is_match(text)
            || self.self_directed.is_match(text)
            || self.is_question(text)
        {
            return false;
        }
        (self.send_noun.is_match(text) || self.names_recipient(text))
            && !self.send_negation.is_match(text)
            && !self.chat_redirect.is_match(text)
    }

    /// True for a question that doesn't read as a polite command
    pub fn is_question(&self, text: &str) -> bool {
        self.interrogative.is_match(text.trim()) && !self.polite_request.is_match(text.trim())
    }

    fn names_recipient(&self, text: &str) -> bool {
        self.recipient
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .any(|m| !NOT_RECIPIENTS.contains(&m.as_str().to_lowercase().as_str()))
    }

    fn match_rules(&self, rules: &[PatternRule], text: &str, confidence: f32) -> Option<Intent> {
        let question = self.is_question(text);
        rules.iter().find_map(|rule| {
            if question && rule.kind.is_system_control() {
                return None;
            }
            let caps = rule.regex.captures(text)?;
            let mut intent = Intent::new(rule.kind, confidence);
            intent.entities = rule.entities(&caps);
            intent.raw_match = caps.get(0).map(|m| m.as_str().to_string());
            Some(intent)
        })
    }

    fn conditional_autoreply(&self, text: &str) -> Option<Intent> {
        let caps = self.conditional.captures(text)?;
        let mut intent = Intent::new(IntentKind::AutopilotEnable, TABLE_CONFIDENCE)
            .with_raw_match(caps.get(0).map_or("", |m| m.as_str()));
        if let Some(contact) = caps.get(1) {
            intent = intent.with_entity(Slot::Contact, contact.as_str().trim());
        }
        if let Some(tone) = self
            .conditional_tone
            .captures(text)
            .and_then(|c| c.get(1))
        {
            intent = intent.with_entity(Slot::Tone, tone.as_str().to_lowercase());
        }
        Some(intent)
    }

    /// A bare name right after a monitor request corrects its contact
    fn contact_correction(&self, text: &str, ctx: &ContextSnapshot) -> Option<Intent> {
        if ctx.last_intent != Some(IntentKind::Monitor) || text.contains('?') {
            return None;
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() || words.len() > 3 {
            return None;
        }
        if !words[0].chars().next().is_some_and(char::is_uppercase) {
            return None;
        }
        let has_command = words.iter().any(|w| {
            let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            COMMAND_VERBS.contains(&w.as_str())
        });
        if has_command || self.match_rules(&self.table, text, TABLE_CONFIDENCE).is_some() {
            return None;
        }
        match clean_contact(text) {
            ContactSlot::Name(name) => Some(
                Intent::new(IntentKind::Monitor, FAST_PATH_CONFIDENCE)
                    .with_entity(Slot::Contact, name)
                    .with_raw_match(text),
            ),
            _ => None,
        }
    }

    fn send_fast_path(&self, text: &str) -> Intent {
        let mut intent = self
            .match_rules(&self.send_rules, text, FAST_PATH_CONFIDENCE)
            .unwrap_or_else(|| Intent::new(IntentKind::SendMessage, FAST_PATH_CONFIDENCE));

        if intent.contact().is_none() {
            if let Some(first) = self.targets.extract(text).into_iter().next() {
                intent.entities.insert(Slot::Contact, first);
            }
        }
        intent
    }

    /// Clean the contact slot and back-fill it from context
    fn finish(&self, mut intent: Intent, ctx: &ContextSnapshot) -> Intent {
        if intent.kind.carries_contact() {
            let slot = intent
                .entities
                .remove(&Slot::Contact)
                .map(|raw| clean_contact(&raw))
                .unwrap_or(ContactSlot::Empty);
            if let Some(contact) = backfill_contact(intent.kind, slot, ctx) {
                intent.entities.insert(Slot::Contact, contact);
            }
        }
        if let Some(tone) = intent.entities.get_mut(&Slot::Tone) {
            *tone = tone.to_lowercase();
        }

        debug!(
            kind = intent.kind.as_str(),
            confidence = intent.confidence,
            contact = intent.contact().unwrap_or(""),
            "classified"
        );
        intent
    }
}

fn keyword_fallback(text: &str) -> Option<Intent> {
    let padded = format!(
        " {} ",
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    );
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| padded.contains(&format!(" {} ", w))))
        .map(|(kind, _)| Intent::new(*kind, KEYWORD_CONFIDENCE).with_entity(Slot::Raw, text))
}
