//! Contacts: the directory seam and fuzzy name resolution
//!
//! The engine never talks to an address book directly. A `ContactDirectory`
//! hands over candidates and the `ContactResolver` decides whether a spoken
//! name picks exactly one of them, several of them, or none.

pub mod resolver;

pub use resolver::{ContactResolver, Resolution};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::core::error::Result;

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Transport-level identifier (phone number, chat id, ...)
    pub id: String,
    /// Human-readable name as stored in the directory
    pub display_name: String,
}

impl Contact {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Source of contact candidates
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn contacts(&self) -> Result<Vec<Contact>>;
}

/// Normalize a name for comparison: lowercase, strip diacritics, collapse whitespace
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
