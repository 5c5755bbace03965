use thiserror::Error;

use crate::plan::PlanStatus;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Module {module} failed: {message}")]
    Module { module: String, message: String },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Generator returned empty text")]
    EmptyGeneration,

    #[error("Invalid plan transition: cannot {action} a plan in state {from:?}")]
    InvalidPlanTransition {
        from: PlanStatus,
        action: &'static str,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Contact directory error: {0}")]
    Directory(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl AssistError {
    pub fn module(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;
