//! Compound command splitting ("message Paulo hello and monitor his chat")

use regex::Regex;

use crate::core::error::Result;

#[derive(Debug, Clone)]
pub struct CompoundSplitter {
    join: Regex,
    continuation: Regex,
}

impl CompoundSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            join: Regex::new(
                r"(?i)\s+and\s+(?:then\s+)?((?:monitor|watch|read|check|see|show|send|message|text|tell|remind|open|search|look)\b.*)$",
            )?,
            continuation: Regex::new(
                r"(?i)^(?:send|message|text|deliver)\s+(?:it|this|that|the\s+message)\b",
            )?,
        })
    }

    /// Split on " and <command verb> " into independently classifiable clauses
    ///
    /// A composition followed by "and send it ..." stays one command.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        let Some(caps) = self.join.captures(text) else {
            return vec![text.to_string()];
        };
        let (Some(whole), Some(rest)) = (caps.get(0), caps.get(1)) else {
            return vec![text.to_string()];
        };

        let head = text[..whole.start()].trim();
        let rest = rest.as_str().trim();
        if head.is_empty() || self.continuation.is_match(rest) {
            return vec![text.to_string()];
        }

        let mut parts = vec![head.to_string()];
        parts.extend(self.split(rest));
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_commands() {
        let splitter = CompoundSplitter::new().unwrap();
        assert_eq!(
            splitter.split("message Paulo hello and monitor his chat"),
            vec!["message Paulo hello", "monitor his chat"]
        );
    }

    #[test]
    fn test_compose_and_send_is_one_command() {
        let splitter = CompoundSplitter::new().unwrap();
        let text = "write a message introducing yourself and send it to Ana";
        assert_eq!(splitter.split(text), vec![text]);
    }

    #[test]
    fn test_contact_pairs_are_not_split() {
        let splitter = CompoundSplitter::new().unwrap();
        let text = "send a message to Ana and Bia";
        assert_eq!(splitter.split(text), vec![text]);
    }

    #[test]
    fn test_three_clauses() {
        let splitter = CompoundSplitter::new().unwrap();
        assert_eq!(
            splitter.split("text Ana hi and then read her chat and monitor Bia"),
            vec!["text Ana hi", "read her chat", "monitor Bia"]
        );
    }
}
