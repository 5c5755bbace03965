//! Turn memory
//!
//! Every processed turn is handed to a `MemoryStore`. `JsonlMemory` appends
//! one JSON object per line to a file.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::core::error::Result;

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn save_turn(&self, message: &str, response: &str, intent_label: &str) -> Result<()>;
}

pub struct JsonlMemory {
    path: PathBuf,
}

impl JsonlMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl MemoryStore for JsonlMemory {
    async fn save_turn(&self, message: &str, response: &str, intent_label: &str) -> Result<()> {
        let record = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "message": message,
            "response": response,
            "intent": intent_label,
        });
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
