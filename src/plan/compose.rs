//! Compose-request policy table
//!
//! A send request is a "compose it for me" request when it describes the
//! message instead of quoting it. The table is ordered only for readability;
//! any hit counts.

use crate::core::config::ComposeConfig;

const BUILTIN_PHRASES: &[&str] = &[
    "introducing yourself",
    "introducing myself",
    "introduce yourself",
    "introduce myself",
    "introduction",
    "what you can do",
    "your capabilities",
    "your functions",
    "your own message",
    "your own words",
    "write a message",
    "compose a message",
    "draft a message",
    "create a message",
    "make a message",
    "write something",
    "love message",
    "declaration of love",
    "romantic",
    "loving message",
    "sweet message",
    "cute message",
    "more formal",
    "more informal",
    "formal message",
    "informal message",
    "professional message",
    "in a formal tone",
    "in an informal tone",
    "in a friendly tone",
];

/// Decides whether a send request asks the assistant to write the content
#[derive(Debug, Clone)]
pub struct ComposePolicy {
    phrases: Vec<String>,
}

impl ComposePolicy {
    pub fn new(config: &ComposeConfig) -> Self {
        let mut phrases: Vec<String> = BUILTIN_PHRASES.iter().map(|p| p.to_string()).collect();
        phrases.extend(
            config
                .extra_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty()),
        );
        Self { phrases }
    }

    pub fn is_compose_request(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }
}

impl Default for ComposePolicy {
    fn default() -> Self {
        Self::new(&ComposeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_phrases() {
        let policy = ComposePolicy::default();
        assert!(policy.is_compose_request("send Ana a message introducing myself"));
        assert!(policy.is_compose_request("Write a message to Bob about what you can do"));
        assert!(!policy.is_compose_request("message Juliana that I'm running late"));
    }

    #[test]
    fn test_extra_keywords_extend_table() {
        let policy = ComposePolicy::new(&ComposeConfig {
            extra_keywords: vec!["Birthday Note".into(), "  ".into()],
        });
        assert!(policy.is_compose_request("send mom a birthday note"));
        assert!(!policy.is_compose_request("send mom hi"));
    }
}
