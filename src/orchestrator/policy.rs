//! Routing table and reply vocabularies
//!
//! Everything here is a pure function over text or intent kinds, so the
//! orchestrator's decisions can be tested without any collaborator.

use crate::intent::IntentKind;
use crate::modules::ModuleKind;

const AFFIRM: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "confirm", "confirmed", "proceed",
    "go ahead", "do it", "send it", "please do", "go for it", "of course",
];

const AFFIRM_PREFIXES: &[&str] = &["yes ", "sure ", "ok ", "okay ", "go ahead "];

const CANCEL: &[&str] = &[
    "no", "n", "nope", "nah", "cancel", "cancel it", "stop", "don't", "do not", "never mind",
    "nevermind", "forget it", "i don't want to",
];

const CANCEL_PREFIXES: &[&str] = &["no ", "don't ", "do not "];

const STOP: &[&str] = &[
    "stop", "stop it", "stop that", "cancel", "cancel that", "never mind", "nevermind",
    "forget it", "enough",
];

/// Verbs that only ever mean delivering a message
const SEND_VERBS: &[&str] = &["send", "reply"];

/// Verbs that mean sending only next to a message noun or a named recipient
const LOOSE_SEND_VERBS: &[&str] = &["tell", "write", "text", "message"];

const MESSAGE_NOUNS: &[&str] = &["message", "msg", "note", "text"];

const QUESTION_WORDS: &[&str] = &["what", "how", "why", "which", "who", "when", "where"];

/// Tone words that turn "name + tone" into a send follow-up
const CONTINUATION_TONES: &[&str] = &[
    "cute", "sweet", "romantic", "loving", "lovely", "nice", "affectionate", "friendly", "formal",
    "funny",
];

fn normalized(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_lowercase()
}

pub fn is_affirm(text: &str) -> bool {
    let msg = normalized(text);
    AFFIRM.contains(&msg.as_str()) || AFFIRM_PREFIXES.iter().any(|p| msg.starts_with(p))
}

pub fn is_cancel(text: &str) -> bool {
    let msg = normalized(text);
    CANCEL.contains(&msg.as_str()) || CANCEL_PREFIXES.iter().any(|p| msg.starts_with(p))
}

/// Global stop phrase, honoured before classification
pub fn is_stop(text: &str) -> bool {
    STOP.contains(&normalized(text).as_str())
}

/// Whether a message nobody could classify still reads like a send
///
/// Questions and "tell me ..."/"write me ..." requests never do.
pub fn has_send_verb(text: &str) -> bool {
    let words = words(text);
    let Some(first) = words.first() else {
        return false;
    };
    if QUESTION_WORDS.contains(&first.as_str()) {
        return false;
    }
    let verb = |w: &str| SEND_VERBS.contains(&w) || LOOSE_SEND_VERBS.contains(&w);
    if words.windows(2).any(|pair| verb(pair[0].as_str()) && pair[1] == "me") {
        return false;
    }
    if words.iter().any(|w| SEND_VERBS.contains(&w.as_str())) {
        return true;
    }
    let Some(at) = words.iter().position(|w| LOOSE_SEND_VERBS.contains(&w.as_str())) else {
        return false;
    };
    words[at + 1..].iter().any(|w| MESSAGE_NOUNS.contains(&w.as_str())) || names_recipient(text)
}

/// "to <Name>" with a capitalised name
fn names_recipient(text: &str) -> bool {
    let raw: Vec<&str> = text.split_whitespace().collect();
    raw.windows(2).any(|pair| {
        pair[0].eq_ignore_ascii_case("to")
            && pair[1].chars().next().is_some_and(char::is_uppercase)
    })
}

/// A short "name + tone word" message, e.g. "Ana something sweet"
///
/// Returns the name and the tone word.
pub fn send_continuation(text: &str) -> Option<(String, String)> {
    let raw: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 1 && w.chars().all(char::is_alphabetic))
        .collect();
    if !(2..=6).contains(&raw.len()) {
        return None;
    }
    let tone = raw
        .iter()
        .map(|w| w.to_lowercase())
        .find(|w| CONTINUATION_TONES.contains(&w.as_str()))?;
    let name = raw
        .iter()
        .find(|w| w.chars().next().is_some_and(char::is_uppercase))
        .filter(|w| !CONTINUATION_TONES.contains(&w.to_lowercase().as_str()))?;
    Some((name.to_string(), tone))
}

/// Kinds that run without a confirmation even at low confidence
pub fn is_safe(kind: IntentKind) -> bool {
    matches!(
        kind,
        IntentKind::Conversation
            | IntentKind::ConversationQuestion
            | IntentKind::Greeting
            | IntentKind::Thanks
            | IntentKind::Farewell
            | IntentKind::Capabilities
            | IntentKind::MonitorStatus
            | IntentKind::AutopilotStatus
            | IntentKind::SystemInfo
            | IntentKind::Weather
            | IntentKind::News
            | IntentKind::Search
    )
}

/// Static intent → module table. `None` means answered by the orchestrator.
pub fn route(kind: IntentKind) -> Option<ModuleKind> {
    let module = match kind {
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
        | IntentKind::AutopilotSetTone => ModuleKind::Messaging,
        IntentKind::Capabilities => return None,
        IntentKind::Reminder | IntentKind::Alarm | IntentKind::Schedule => ModuleKind::Calendar,
        IntentKind::Translation => ModuleKind::Translation,
        IntentKind::Search => ModuleKind::Search,
        IntentKind::Weather => ModuleKind::Weather,
        IntentKind::News => ModuleKind::News,
        IntentKind::FileOperation | IntentKind::Backup => ModuleKind::Files,
        IntentKind::SystemInfo | IntentKind::SystemCommand | IntentKind::AppControl => {
            ModuleKind::System
        }
        IntentKind::Productivity | IntentKind::Automation => ModuleKind::Productivity,
        IntentKind::ConversationQuestion
        | IntentKind::Greeting
        | IntentKind::Thanks
        | IntentKind::Farewell
        | IntentKind::Sentiment
        | IntentKind::Conversation => ModuleKind::Conversation,
    };
    Some(module)
}

pub fn capabilities(assistant_name: &str) -> String {
    format!(
        "{} can help with:\n\
         - Messaging: send and read messages, monitor a chat, check what's new\n\
         - Autopilot: reply to a contact for you in a chosen tone for a while\n\
         - Writing: compose a message in your name and send it after you confirm\n\
         - Search, weather and news\n\
         - Reminders, alarms and your calendar\n\
         - Translation, files, backups and system information\n\
         - Conversation: questions and small talk",
        assistant_name
    )
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirm_and_cancel() {
        assert!(is_affirm("Yes"));
        assert!(is_affirm("ok!"));
        assert!(is_affirm("yes please"));
        assert!(!is_affirm("maybe later"));

        assert!(is_cancel("No."));
        assert!(is_cancel("no thanks"));
        assert!(!is_cancel("now"));
    }

    #[test]
    fn test_stop_is_exact() {
        assert!(is_stop("Stop!"));
        assert!(is_stop("never mind"));
        assert!(!is_stop("stop monitoring Ana"));
    }

    #[test]
    fn test_send_verb_needs_a_send() {
        assert!(has_send_verb("send it"));
        assert!(has_send_verb("just write a note"));
        assert!(has_send_verb("write to Ana later"));

        assert!(!has_send_verb("tell me a joke"));
        assert!(!has_send_verb("write me a poem about the sea"));
        assert!(!has_send_verb("tell me about yourself"));
        assert!(!has_send_verb("how do I send a fax?"));
        assert!(!has_send_verb("I like to write stories"));
        assert!(!has_send_verb(""));
    }

    #[test]
    fn test_send_continuation() {
        assert_eq!(
            send_continuation("Ana something sweet"),
            Some(("Ana".to_string(), "sweet".to_string()))
        );
        assert_eq!(send_continuation("sweet"), None);
        assert_eq!(send_continuation("what a nice day it is today friend"), None);
    }

    #[test]
    fn test_read_history_is_not_safe() {
        assert!(!is_safe(IntentKind::ReadHistory));
        assert!(!is_safe(IntentKind::SendMessage));
        assert!(is_safe(IntentKind::Weather));
    }

    #[test]
    fn test_route_table() {
        assert_eq!(route(IntentKind::ReadHistory), Some(ModuleKind::Messaging));
        assert_eq!(route(IntentKind::Alarm), Some(ModuleKind::Calendar));
        assert_eq!(route(IntentKind::Greeting), Some(ModuleKind::Conversation));
        assert_eq!(route(IntentKind::Capabilities), None);
    }
}
