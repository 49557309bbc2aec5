//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SyncError};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8123";
pub const DEFAULT_ASSISTANT_ID: &str = "graph";
pub const DEFAULT_GENERATION_NODE: &str = "generate_node";
pub const DEFAULT_STREAM_EVENT: &str = "on_chat_model_stream";
pub const DEFAULT_NODE_FIELD: &str = "langgraph_node";
pub const DEFAULT_TITLE_MAX_CHARS: usize = 100;

/// Settings for talking to the graph backend and shaping transcripts.
///
/// Resolution order, later wins:
/// 1. Built-in defaults
/// 2. `~/.graphchat/config.toml` (or an explicit file)
/// 3. Environment variables (a `.env` file is loaded first if present)
/// 4. `with_*` setters in code
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// `None` means no backend was configured anywhere, only the default.
    backend_url: Option<String>,
    pub api_key: Option<String>,
    pub assistant_id: String,
    pub generation_node: String,
    pub stream_event: String,
    pub node_field: String,
    pub title_max_chars: usize,
    pub connect_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_key: None,
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            generation_node: DEFAULT_GENERATION_NODE.to_string(),
            stream_event: DEFAULT_STREAM_EVENT.to_string(),
            node_field: DEFAULT_NODE_FIELD.to_string(),
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    backend_url: Option<String>,
    api_key: Option<String>,
    assistant_id: Option<String>,
    generation_node: Option<String>,
    stream_event: Option<String>,
    node_field: Option<String>,
    title_max_chars: Option<usize>,
    connect_timeout_secs: Option<u64>,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Defaults, then the config file (if it exists), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => Self::from_toml_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(err) => return Err(err.into()),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(raw)
            .map_err(|e| SyncError::Configuration(format!("invalid config file: {e}")))?;
        let mut config = Self::new();
        config.backend_url = file.backend_url.or(config.backend_url);
        config.api_key = file.api_key.or(config.api_key);
        if let Some(v) = file.assistant_id {
            config.assistant_id = v;
        }
        if let Some(v) = file.generation_node {
            config.generation_node = v;
        }
        if let Some(v) = file.stream_event {
            config.stream_event = v;
        }
        if let Some(v) = file.node_field {
            config.node_field = v;
        }
        if let Some(v) = file.title_max_chars {
            config.title_max_chars = v;
        }
        if let Some(secs) = file.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(*k).filter(|v| !v.is_empty()));

        if let Some(url) = first(&["GRAPHCHAT_BACKEND_URL", "LANGGRAPH_API_URL"]) {
            self.backend_url = Some(url);
        }
        if let Some(key) = first(&["GRAPHCHAT_API_KEY", "LANGSMITH_API_KEY"]) {
            self.api_key = Some(key);
        }
        if let Some(v) = first(&["GRAPHCHAT_ASSISTANT_ID"]) {
            self.assistant_id = v;
        }
        if let Some(v) = first(&["GRAPHCHAT_GENERATION_NODE"]) {
            self.generation_node = v;
        }
        if let Some(v) = first(&["GRAPHCHAT_STREAM_EVENT"]) {
            self.stream_event = v;
        }
        if let Some(v) = first(&["GRAPHCHAT_NODE_FIELD"]) {
            self.node_field = v;
        }
        if let Some(secs) = first(&["GRAPHCHAT_CONNECT_TIMEOUT_SECS"]) {
            match secs.parse::<u64>() {
                Ok(secs) => self.connect_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %secs, "ignoring invalid GRAPHCHAT_CONNECT_TIMEOUT_SECS"),
            }
        }
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = id.into();
        self
    }

    pub fn with_generation_node(mut self, node: impl Into<String>) -> Self {
        self.generation_node = node.into();
        self
    }

    /// Backend base URL without a trailing slash.
    pub fn backend_url(&self) -> &str {
        self.backend_url
            .as_deref()
            .unwrap_or(DEFAULT_BACKEND_URL)
            .trim_end_matches('/')
    }

    /// Names of required settings that were never configured.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.backend_url.is_none() {
            missing.push("GRAPHCHAT_BACKEND_URL");
        }
        if self.assistant_id.trim().is_empty() {
            missing.push("GRAPHCHAT_ASSISTANT_ID");
        }
        if self.generation_node.trim().is_empty() {
            missing.push("GRAPHCHAT_GENERATION_NODE");
        }
        missing
    }
}

/// `~/.graphchat`, or `.graphchat` when no home directory is known.
pub fn default_data_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".graphchat"))
        .unwrap_or_else(|| PathBuf::from(".graphchat"))
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}
