//! Configuration schema for toolrelay.toml.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Socket address the HTTP API binds to.
    pub listen_addr: String,

    /// Path to SQLite database holding tool definitions.
    pub db_path: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Deadline for one outbound tool call, in seconds.
    pub request_timeout_secs: u64,

    /// Fail executions whose auth config is missing or malformed instead of
    /// sending them unauthenticated.
    pub strict_auth: bool,

    /// Wrap directive results in the tool envelope before they reach the model.
    pub directive_envelope: bool,

    /// API key used when seeding the Weather tool.
    pub openweather_api_key: String,

    /// Completion API the chat pipeline forwards to.
    pub completion: CompletionConfig,
}

/// Settings for the chat-completion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// OpenAI-compatible API base URL.
    pub api_url: String,

    /// API key sent as a bearer token.
    pub api_key: String,

    /// Model every chat turn is sent to.
    pub model: String,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    pub temperature: f64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".into(),
            db_path: "~/.toolrelay/tools.db".into(),
            log_level: "info".into(),
            request_timeout_secs: 30,
            strict_auth: false,
            directive_envelope: true,
            openweather_api_key: String::new(),
            completion: CompletionConfig::default(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".into(),
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl RelayConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved database path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    /// Outbound request deadline. Zero falls back to 30 seconds.
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => Duration::from_secs(30),
            secs => Duration::from_secs(secs),
        }
    }
}
