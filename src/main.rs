//! Parley - interactive harness
//!
//! Reads messages from stdin and prints the assistant's replies. Sends are
//! dry-run: they are printed instead of delivered.

use async_trait::async_trait;
use clap::Parser;
use parley::contacts::{Contact, ContactDirectory};
use parley::context::ContextManager;
use parley::core::config::EngineConfig;
use parley::core::error::{AssistError, Result};
use parley::core::types::{ChatMessage, MessageSource};
use parley::llm::{Generation, Generator, LlmClient};
use parley::modules::{
    ConversationModule, JsonlMemory, Messenger, MessagingModule, SendOutcome, TransportMessage,
};
use parley::{Assistant, Orchestrator};

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Talk to the assistant from the terminal")]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where long-lived context is persisted between runs
    #[arg(long)]
    state: Option<PathBuf>,

    /// JSON file with `[{"id": ..., "display_name": ...}]` contacts
    #[arg(long)]
    contacts: Option<PathBuf>,

    /// Append every turn to this JSONL file
    #[arg(long)]
    memory: Option<PathBuf>,
}

/// Prints messages instead of sending them
struct ConsoleMessenger;

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, contact: &str, text: &str) -> Result<SendOutcome> {
        let mut out = io::stdout().lock();
        writeln!(out, "  [dry-run] to {}: {}", contact, text)
            .and_then(|_| out.flush())
            .map_err(|e| AssistError::Transport(e.to_string()))?;
        Ok(SendOutcome::default())
    }

    async fn read_history(&self, _contact: &str, _limit: usize) -> Result<Vec<TransportMessage>> {
        Ok(Vec::new())
    }
}

/// Contacts loaded once from a JSON file
struct FileDirectory {
    contacts: Vec<Contact>,
}

impl FileDirectory {
    fn load(path: &Path) -> Result<Self> {
        let contacts = serde_json::from_str(&std::fs::read_to_string(path)?)
            .map_err(|e| AssistError::Directory(e.to_string()))?;
        Ok(Self { contacts })
    }
}

#[async_trait]
impl ContactDirectory for FileDirectory {
    async fn contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.contacts.clone())
    }
}

/// Stand-in when no LLM is configured
struct OfflineGenerator;

#[async_trait]
impl Generator for OfflineGenerator {
    async fn generate(&self, _system_prompt: &str, _messages: &[ChatMessage]) -> Result<Generation> {
        Err(AssistError::Llm("no language model configured".into()))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter("parley=debug")
        .init();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let rt = Runtime::new()?;

    let generator: Arc<dyn Generator> = match LlmClient::from_env(&config.llm) {
        Ok(client) => Arc::new(client),
        Err(_) => {
            tracing::warn!("LLM_API_KEY not set - conversation and compose steps are disabled");
            Arc::new(OfflineGenerator)
        }
    };

    let mut orchestrator = Orchestrator::new(config.clone())?
        .with_module(Arc::new(MessagingModule::new(Arc::new(ConsoleMessenger), &config)))
        .with_module(Arc::new(ConversationModule::new(generator.clone(), &config)))
        .with_generator(generator);
    if let Some(path) = &args.contacts {
        orchestrator = orchestrator.with_directory(Arc::new(FileDirectory::load(path)?));
    }
    if let Some(path) = &args.memory {
        orchestrator = orchestrator.with_memory(Arc::new(JsonlMemory::new(path)));
    }

    let mut assistant = Assistant::new(orchestrator, ContextManager::from_config(&config));
    if let Some(path) = &args.state {
        assistant = assistant.with_state_path(path);
        assistant.restore()?;
    }

    println!("\n=== {} ===", config.assistant_name.to_uppercase());
    println!("  /from <contact>: <text>  - simulate an incoming message");
    println!("  quit / q                 - exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        if let Some(rest) = input.strip_prefix("/from ") {
            match rest.split_once(':') {
                Some((contact, text)) => {
                    if let Some(note) = assistant.receive(contact.trim(), text.trim()) {
                        println!("{}", note);
                    }
                }
                None => println!("usage: /from <contact>: <text>"),
            }
            continue;
        }

        match rt.block_on(assistant.handle(input, MessageSource::Text)) {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("Error: {}\n", e);
            }
        }
    }

    Ok(())
}
