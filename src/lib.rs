//! Parley - command-interpretation engine for a conversational assistant
//!
//! Turns free-form messages into typed intents, resolves who they are about,
//! gates risky actions behind confirmations and routes the rest to
//! capability modules.

pub mod assistant;
pub mod contacts;
pub mod context;
pub mod core;
pub mod intent;
pub mod llm;
pub mod modules;
pub mod orchestrator;
pub mod plan;

pub use assistant::Assistant;
pub use orchestrator::{Orchestrator, Turn};
