//! CLI entry point for graphchat.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::SyncConfig;
use crate::error::Result;

/// graphchat CLI
#[derive(Parser, Debug)]
#[command(name = "graphchat", version, about = "Chat with a streaming graph backend")]
pub struct Cli {
    /// Config file (default: ~/.graphchat/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one or more questions in a new conversation
    Ask(AskArgs),
    /// Show a saved conversation
    History(HistoryArgs),
    /// Report missing configuration
    Check,
}

/// Arguments for the `ask` subcommand.
#[derive(Parser, Debug)]
pub struct AskArgs {
    /// Backend base URL (overrides config and env)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Assistant (graph) id
    #[arg(long)]
    pub assistant_id: Option<String>,

    /// Node whose token stream is the answer
    #[arg(long)]
    pub node: Option<String>,

    /// Save the transcript for this user id
    #[arg(short, long)]
    pub user: Option<String>,

    /// Directory for saved chats (default: ~/.graphchat/chats)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Questions, asked in order in the same conversation
    #[arg(required = true)]
    pub questions: Vec<String>,
}

/// Arguments for the `history` subcommand.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Chat id (the backend thread id)
    pub chat_id: String,

    /// Owner of the chat
    #[arg(short, long)]
    pub user: String,

    /// Directory for saved chats (default: ~/.graphchat/chats)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
}

impl AskArgs {
    /// Load config and apply command-line overrides.
    pub fn resolve_config(&self, path: Option<&std::path::Path>) -> Result<SyncConfig> {
        let mut config = SyncConfig::load(path)?;
        if let Some(url) = &self.backend_url {
            config = config.with_backend_url(url);
        }
        if let Some(id) = &self.assistant_id {
            config = config.with_assistant_id(id);
        }
        if let Some(node) = &self.node {
            config = config.with_generation_node(node);
        }
        Ok(config)
    }
}

/// The answer suffix not yet printed, or `None` if the text was replaced.
pub fn unseen_suffix<'a>(printed: &str, text: &'a str) -> Option<&'a str> {
    text.strip_prefix(printed)
}
