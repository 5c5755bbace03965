//! Style cues for composed messages
//!
//! Tone, relationship and formality come from keyword presence in the
//! user's original request. Nothing is inferred from generated text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Romantic,
    Friendly,
    Professional,
    Playful,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Romantic => "romantic",
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
            Tone::Playful => "playful",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Formal,
    Informal,
}

/// Style hints attached to a compose step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleHints {
    pub tone: Option<Tone>,
    pub relationship: Option<String>,
    pub formality: Option<Formality>,
}

const TONE_CUES: &[(Tone, &[&str])] = &[
    (
        Tone::Romantic,
        &[
            "love",
            "loving",
            "romantic",
            "sweet",
            "cute",
            "girlfriend",
            "boyfriend",
            "declaration of love",
        ],
    ),
    (Tone::Professional, &["professional", "business"]),
    (Tone::Playful, &["funny", "joke", "playful"]),
    (Tone::Friendly, &["friendly", "warm", "kind"]),
];

const RELATIONSHIPS: &[&str] = &[
    "girlfriend",
    "boyfriend",
    "wife",
    "husband",
    "mom",
    "mother",
    "dad",
    "father",
    "friend",
    "colleague",
    "boss",
];

impl StyleHints {
    /// Detect style cues in a request
    pub fn detect(request: &str) -> Self {
        let padded = format!(" {} ", words(request).join(" "));
        let has = |cue: &str| padded.contains(&format!(" {} ", cue));

        let tone = TONE_CUES
            .iter()
            .find(|(_, cues)| cues.iter().any(|c| has(c)))
            .map(|(tone, _)| *tone);

        let relationship = RELATIONSHIPS
            .iter()
            .find(|r| has(r))
            .map(|r| r.to_string());

        let formality = if has("informal") || has("casual") {
            Some(Formality::Informal)
        } else if has("formal") || has("professional") {
            Some(Formality::Formal)
        } else if tone == Some(Tone::Romantic) {
            Some(Formality::Informal)
        } else {
            None
        };

        Self {
            tone,
            relationship,
            formality,
        }
    }

    /// Short description used in plan summaries ("a romantic message")
    pub fn describe(&self) -> String {
        match (self.tone, self.formality) {
            (Some(tone), _) => format!("a {} message", tone.as_str()),
            (None, Some(Formality::Formal)) => "a formal message".into(),
            (None, Some(Formality::Informal)) => "an informal message".into(),
            (None, None) => "a message".into(),
        }
    }

    /// Instructions for the generator
    pub fn instructions(&self) -> String {
        let mut lines = Vec::new();
        if let Some(tone) = self.tone {
            lines.push(format!("Use a {} tone.", tone.as_str()));
        }
        match self.formality {
            Some(Formality::Formal) => lines.push("Keep it formal and polite.".into()),
            Some(Formality::Informal) => lines.push("Keep it casual and natural.".into()),
            None => {}
        }
        if let Some(rel) = &self.relationship {
            lines.push(format!("The recipient is the user's {}.", rel));
        }
        lines.join(" ")
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_romantic_request_defaults_informal() {
        let hints = StyleHints::detect("send a love message to my girlfriend Ana");
        assert_eq!(hints.tone, Some(Tone::Romantic));
        assert_eq!(hints.relationship.as_deref(), Some("girlfriend"));
        assert_eq!(hints.formality, Some(Formality::Informal));
    }

    #[test]
    fn test_informal_is_not_read_as_formal() {
        let hints = StyleHints::detect("write Bob an informal note");
        assert_eq!(hints.formality, Some(Formality::Informal));
    }

    #[test]
    fn test_formal_request() {
        let hints = StyleHints::detect("send my boss a formal message introducing myself");
        assert_eq!(hints.formality, Some(Formality::Formal));
        assert_eq!(hints.relationship.as_deref(), Some("boss"));
        assert_eq!(hints.tone, None);
        assert_eq!(hints.describe(), "a formal message");
    }

    #[test]
    fn test_no_cues() {
        let hints = StyleHints::detect("send Ana a message introducing myself");
        assert_eq!(hints, StyleHints::default());
        assert!(hints.instructions().is_empty());
    }
}
