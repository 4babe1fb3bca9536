//! Error taxonomy for tool execution and administration.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single tool execution or catalog operation.
///
/// Template, auth and mapping problems are absorbed where they occur and
/// never show up here (unless strict auth is enabled).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("External tool not found: {0}")]
    NotFound(String),

    #[error("External tool is not active: {0}")]
    Inactive(String),

    #[error("Invalid tool configuration: {0}")]
    Configuration(String),

    #[error("External tool request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("External tool request failed: {0}")]
    Transport(String),

    #[error("External tool request failed with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("A tool named '{0}' already exists")]
    DuplicateName(String),

    #[error("Tool store error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ToolError {
    /// Stable machine-readable kind, used in structured API errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Inactive(_) => "inactive",
            Self::Configuration(_) => "configuration",
            Self::Timeout(_) | Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::DuplicateName(_) => "duplicate_name",
            Self::Storage(_) => "storage",
        }
    }

    /// Whether this failure came from the outbound call (timeout, network, remote status).
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport(_) | Self::Status { .. }
        )
    }
}
