//! Engine configuration with documented constants
//!
//! Every threshold the engine consults lives here, with a note on what it
//! trades off. Values load from TOML; anything missing keeps its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{AssistError, Result};

/// Top-level configuration for the interpretation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name the assistant uses for itself in prompts and capability listings
    pub assistant_name: String,

    // === CONFIDENCE GATE ===
    /// Minimum classifier confidence for acting on an intent without asking
    ///
    /// Pattern-table matches score 0.9 and send fast-paths 0.85, so they clear
    /// the gate. Keyword fallbacks (0.6) and generic conversation (0.5) do not,
    /// unless their kind is on the safe allow-list.
    pub confidence_threshold: f32,

    pub resolver: ResolverConfig,
    pub context: ContextConfig,
    pub autopilot: AutopilotConfig,
    pub compose: ComposeConfig,
    pub messaging: MessagingConfig,
    pub llm: LlmConfig,
}

/// Thresholds for fuzzy contact matching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Score at which a clear winner is accepted outright
    pub accept_threshold: f32,

    /// Minimum score for a candidate to count as a tie with the top
    ///
    /// Below this, near-equal scores are noise rather than ambiguity.
    pub suggest_threshold: f32,

    /// Relative window (fraction of the top score) that defines a tie
    ///
    /// At 0.05, anything scoring at least 95% of the best candidate is
    /// considered equally plausible and forces a clarifying question.
    pub tie_window: f32,

    /// Best score needed before "did you mean" suggestions are offered
    pub suggestion_floor: f32,

    /// Maximum candidates listed in an ambiguity question
    pub max_ambiguous: usize,

    /// Maximum "did you mean" suggestions
    pub max_suggestions: usize,
}

/// Conversation memory limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Messages kept in the rolling history
    pub max_history: usize,

    /// Idle minutes after which short-lived state is purged
    ///
    /// Pending plans, last contact and monitored contacts go stale quickly;
    /// per-contact last messages and autopilot registrations survive.
    pub idle_window_minutes: i64,

    /// Contacts tracked in the last-message LRU
    pub last_message_capacity: usize,

    /// History messages forwarded to the generator as conversation context
    pub prompt_history: usize,
}

/// Defaults for auto-reply registrations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Minutes an auto-reply registration stays active when no TTL is given
    pub ttl_minutes: i64,

    /// Tone used when the user doesn't name one
    pub default_tone: String,
}

/// Compose-request policy table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Extra phrases that mark a send request as "compose it for me"
    ///
    /// Appended to the built-in table, so deployments can teach the engine
    /// new composition phrasings without code changes.
    pub extra_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Messages fetched when the user asks to read a chat
    pub history_limit: usize,
}

/// Generator endpoint settings (the API key always comes from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Parley".into(),
            confidence_threshold: 0.7,
            resolver: ResolverConfig::default(),
            context: ContextConfig::default(),
            autopilot: AutopilotConfig::default(),
            compose: ComposeConfig::default(),
            messaging: MessagingConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.75,
            suggest_threshold: 0.5,
            tie_window: 0.05,
            suggestion_floor: 0.3,
            max_ambiguous: 5,
            max_suggestions: 3,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: 20,
            idle_window_minutes: 30,
            last_message_capacity: 500,
            prompt_history: 10,
        }
    }
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 120,
            default_tone: "friendly".into(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self { history_limit: 10 }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-haiku-20240307".into(),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(AssistError::Config)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate that config values are sensible
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be within [0, 1]".into());
        }
        let r = &self.resolver;
        for (name, value) in [
            ("accept_threshold", r.accept_threshold),
            ("suggest_threshold", r.suggest_threshold),
            ("suggestion_floor", r.suggestion_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("resolver.{} must be within [0, 1]", name));
            }
        }
        if !(0.0..1.0).contains(&r.tie_window) {
            return Err("resolver.tie_window must be within [0, 1)".into());
        }
        if r.suggestion_floor > r.suggest_threshold || r.suggest_threshold > r.accept_threshold {
            return Err(
                "resolver thresholds must satisfy suggestion_floor <= suggest_threshold <= accept_threshold"
                    .into(),
            );
        }
        if r.max_ambiguous == 0 || r.max_suggestions == 0 {
            return Err("resolver candidate limits must be positive".into());
        }
        if self.context.max_history == 0 {
            return Err("context.max_history must be positive".into());
        }
        if self.context.idle_window_minutes <= 0 {
            return Err("context.idle_window_minutes must be positive".into());
        }
        if self.context.last_message_capacity == 0 {
            return Err("context.last_message_capacity must be positive".into());
        }
        if self.autopilot.ttl_minutes <= 0 {
            return Err("autopilot.ttl_minutes must be positive".into());
        }
        Ok(())
    }
}
