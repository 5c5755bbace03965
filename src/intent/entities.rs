//! Contact-slot cleaning and context back-fill
//!
//! Regex captures for names are greedy by nature: "Ana in case she asks
//! about dinner" or "Ana introducing yourself". Cleaning trims a raw capture
//! to the name itself, or classifies it as a pronoun / reference to the
//! monitored contact so context can fill it in.

use regex::Regex;

use crate::context::ContextSnapshot;
use crate::core::error::Result;
use crate::intent::IntentKind;

/// What a cleaned contact capture turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactSlot {
    Name(String),
    Pronoun,
    /// "the contact I asked you to monitor" and friends
    MonitoredRef,
    Empty,
}

const MONITORED_REFERENCES: &[&str] = &[
    "the contact i asked you to monitor",
    "the contact you are monitoring",
    "the contact you're monitoring",
    "the monitored contact",
    "the one you're monitoring",
    "the one you are monitoring",
    "the person you're monitoring",
    "the person you are monitoring",
    "whoever you're monitoring",
];

const PRONOUNS: &[&str] = &[
    "he", "she", "him", "her", "his", "hers", "they", "them", "their", "theirs",
];

const CLAUSE_BOUNDARIES: &[&[&str]] = &[
    &["in", "case"],
    &["and", "when"],
    &["when"],
    &["whenever"],
    &["and", "monitor"],
    &["and", "read"],
    &["and", "check"],
    &["and", "see"],
    &["if"],
    &["while"],
    &["because"],
];

const CONTENT_MARKERS: &[&[&str]] = &[
    &["with"],
    &["introducing"],
    &["introduce"],
    &["formal"],
    &["informal"],
    &["saying"],
    &["telling"],
    &["asking"],
    &["about"],
    &["that"],
    &["professional"],
    &["romantic"],
    &["loving"],
    &["in", "a"],
    &["in", "an"],
    &["a", "message"],
    &["on", "whatsapp"],
    &["for", "me"],
];

const STOP_PHRASES: &[&str] = &[
    "yourself",
    "your own",
    "a message",
    "message",
    "me",
    "myself",
    "you",
    "someone",
    "somebody",
    "it",
    "introducing",
    "what you can do",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "my", "your", "our", "to", "for", "of", "and", "or", "on", "at", "in",
    "please", "now", "again", "also", "too", "chat", "chats", "conversation", "messages",
    "message", "msg", "text", "note", "send", "write", "tell", "ping", "reply", "respond",
    "answer", "monitor", "read", "check", "introduce", "introducing", "yourself", "myself", "me",
    "you", "it", "whatsapp", "saying", "this", "with", "about", "then", "know", "anymore",
];

const MAX_NAME_WORDS: usize = 4;

/// Reduce a raw capture to a contact slot
pub fn clean_contact(raw: &str) -> ContactSlot {
    let head = raw.split(',').next().unwrap_or_default();
    let trimmed = head
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '?' | '!' | '.' | ':' | ';'))
        .trim();
    let lower = trimmed.to_lowercase();
    if lower.is_empty() {
        return ContactSlot::Empty;
    }
    if MONITORED_REFERENCES.iter().any(|r| lower.starts_with(r)) {
        return ContactSlot::MonitoredRef;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let end = cut_index(&lowered, CLAUSE_BOUNDARIES).min(cut_index(&lowered, CONTENT_MARKERS));
    let kept = &words[..end];
    let kept_lower = &lowered[..end];

    if let Some(first) = kept_lower.first() {
        if PRONOUNS.contains(&first.as_str()) {
            return ContactSlot::Pronoun;
        }
    }

    let phrase = kept_lower.join(" ");
    if phrase.is_empty()
        || STOP_PHRASES
            .iter()
            .any(|p| phrase == *p || phrase.starts_with(&format!("{} ", p)))
    {
        return ContactSlot::Empty;
    }

    let mut name: Vec<&str> = kept
        .iter()
        .zip(kept_lower)
        .take_while(|(_, l)| !STOP_WORDS.contains(&l.as_str()))
        .take(MAX_NAME_WORDS)
        .map(|(w, _)| *w)
        .collect();

    if let Some(last) = name.last_mut() {
        let word: &str = *last;
        *last = word
            .strip_suffix("'s")
            .or_else(|| word.strip_suffix("’s"))
            .unwrap_or(word);
    }
    name.retain(|w| !w.is_empty());

    if name.is_empty() {
        ContactSlot::Empty
    } else {
        ContactSlot::Name(name.join(" "))
    }
}

/// Index of the first word where any marker sequence starts (or `words.len()`)
fn cut_index(words: &[String], markers: &[&[&str]]) -> usize {
    (0..words.len())
        .find(|&i| {
            markers.iter().any(|m| {
                i + m.len() <= words.len() && m.iter().zip(&words[i..]).all(|(a, b)| *a == *b)
            })
        })
        .unwrap_or(words.len())
}

/// Fill a pronoun or empty contact slot from context
///
/// Pronouns always resolve. Empty slots only resolve for kinds that act on a
/// single contact. The most recently monitored contact wins over the last
/// one mentioned.
pub fn backfill_contact(
    kind: IntentKind,
    slot: ContactSlot,
    ctx: &ContextSnapshot,
) -> Option<String> {
    let monitored = || ctx.last_monitored().map(str::to_string);
    let last = || ctx.last_contact.clone();

    match slot {
        ContactSlot::Name(name) => Some(name),
        ContactSlot::MonitoredRef => monitored(),
        ContactSlot::Empty if !kind.backfills_contact() => None,
        ContactSlot::Pronoun | ContactSlot::Empty => monitored().or_else(last),
    }
}

/// Finds send targets in a compose request ("send Ana a message ...",
/// "write something nice to Ana and Bia")
///
/// Only the user's request text is searched; generated content never is.
#[derive(Debug, Clone)]
pub struct TargetExtractor {
    indirect: Regex,
    preposition: Regex,
    pair: Regex,
}

impl TargetExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            indirect: Regex::new(
                r"(?i)^(?:please\s+)?(?:(?:can|could|would)\s+you\s+)?(?:send|text|message|write|tell|ping)\s+(.+?)\s+(?:a|an)\s+(?:\w+\s+)?(?:message|msg|text|note)\b",
            )?,
            preposition: Regex::new(r"(?i)\b(?:to|for)\s+")?,
            pair: Regex::new(r"(?i)^(.+?)\s+(?:and|&)\s+(.+)$")?,
        })
    }

    /// Up to two contact names, in the order the user gave them
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut raws: Vec<&str> = Vec::new();
        if let Some(m) = self.indirect.captures(text).and_then(|c| c.get(1)) {
            raws.push(m.as_str());
        }
        raws.extend(self.preposition.find_iter(text).map(|m| &text[m.end()..]));

        raws.into_iter()
            .map(|raw| self.names_in(raw))
            .find(|names| !names.is_empty())
            .unwrap_or_default()
    }

    fn names_in(&self, raw: &str) -> Vec<String> {
        if let Some(caps) = self.pair.captures(raw) {
            let first = caps.get(1).map(|m| clean_contact(m.as_str()));
            let second = caps.get(2).map(|m| clean_contact(m.as_str()));
            if let (Some(ContactSlot::Name(a)), Some(ContactSlot::Name(b))) = (first, second) {
                return vec![a, b];
            }
        }
        match clean_contact(raw) {
            ContactSlot::Name(name) => vec![name],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ContactSlot {
        ContactSlot::Name(s.into())
    }

    #[test]
    fn test_clause_boundary_truncates() {
        assert_eq!(clean_contact("Ana in case she asks about dinner"), name("Ana"));
        assert_eq!(clean_contact("Bia and when she replies"), name("Bia"));
        assert_eq!(clean_contact("Carla, please"), name("Carla"));
    }

    #[test]
    fn test_content_marker_truncates() {
        assert_eq!(clean_contact("Ana introducing yourself"), name("Ana"));
        assert_eq!(clean_contact("Maria Silva with a formal tone"), name("Maria Silva"));
        assert_eq!(clean_contact("Bob formal"), name("Bob"));
    }

    #[test]
    fn test_stop_phrases_discard() {
        assert_eq!(clean_contact("yourself to Ana"), ContactSlot::Empty);
        assert_eq!(clean_contact("a message"), ContactSlot::Empty);
        assert_eq!(clean_contact("me"), ContactSlot::Empty);
    }

    #[test]
    fn test_pronouns_and_monitored_reference() {
        assert_eq!(clean_contact("her"), ContactSlot::Pronoun);
        assert_eq!(clean_contact("his chat"), ContactSlot::Pronoun);
        assert_eq!(
            clean_contact("the contact I asked you to monitor"),
            ContactSlot::MonitoredRef
        );
    }

    #[test]
    fn test_name_is_capped_and_possessive_stripped() {
        assert_eq!(
            clean_contact("Ana Maria Silva Costa Pereira"),
            name("Ana Maria Silva Costa")
        );
        assert_eq!(clean_contact("Paulo's"), name("Paulo"));
        assert_eq!(clean_contact("Juliana."), name("Juliana"));
    }

    #[test]
    fn test_backfill_prefers_monitored_then_last() {
        let mut ctx = ContextSnapshot::default();
        ctx.last_contact = Some("Paulo".into());
        assert_eq!(
            backfill_contact(IntentKind::SendMessage, ContactSlot::Pronoun, &ctx),
            Some("Paulo".into())
        );

        ctx.monitored_contacts = vec!["Bia".into()];
        assert_eq!(
            backfill_contact(IntentKind::SendMessage, ContactSlot::Empty, &ctx),
            Some("Bia".into())
        );
        assert_eq!(
            backfill_contact(IntentKind::Monitor, ContactSlot::Pronoun, &ctx),
            Some("Bia".into())
        );
        assert_eq!(
            backfill_contact(IntentKind::Search, ContactSlot::Empty, &ctx),
            None
        );
    }

    #[test]
    fn test_monitored_reference_without_monitoring_is_none() {
        let mut ctx = ContextSnapshot::default();
        ctx.last_contact = Some("Paulo".into());
        assert_eq!(
            backfill_contact(IntentKind::SendMessage, ContactSlot::MonitoredRef, &ctx),
            None
        );
    }

    #[test]
    fn test_extract_targets() {
        let extractor = TargetExtractor::new().unwrap();
        assert_eq!(
            extractor.extract("send Ana a message introducing myself"),
            vec!["Ana"]
        );
        assert_eq!(
            extractor.extract("write a message introducing yourself to Ana"),
            vec!["Ana"]
        );
        assert_eq!(
            extractor.extract("send a message to Ana and Bia introducing yourself"),
            vec!["Ana", "Bia"]
        );
        assert!(extractor
            .extract("send her a love message")
            .is_empty());
    }
}
