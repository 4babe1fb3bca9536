//! Shared types used across the tool relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flat parameter mapping for one execution (name → string/number/bool).
pub type ToolParams = serde_json::Map<String, serde_json::Value>;

/// Category tag given to tools registered without one.
pub const DEFAULT_TOOL_TYPE: &str = "API";

/// Category tag of tools created through the REST wrapper helper.
pub const REST_WRAPPER_TOOL_TYPE: &str = "MCP_REST_WRAPPER";

// ---------------------------------------------------------------------------
// HTTP method
// ---------------------------------------------------------------------------

/// HTTP verbs a tool may be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Whether the rendered template is sent as a request body.
    pub fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth type
// ---------------------------------------------------------------------------

/// Outbound authentication scheme of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    #[default]
    None,
    ApiKey,
    BearerToken,
    BasicAuth,
    Oauth2,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::ApiKey => write!(f, "API_KEY"),
            Self::BearerToken => write!(f, "BEARER_TOKEN"),
            Self::BasicAuth => write!(f, "BASIC_AUTH"),
            Self::Oauth2 => write!(f, "OAUTH2"),
        }
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "API_KEY" => Ok(Self::ApiKey),
            "BEARER_TOKEN" => Ok(Self::BearerToken),
            "BASIC_AUTH" => Ok(Self::BasicAuth),
            "OAUTH2" => Ok(Self::Oauth2),
            other => Err(format!("unsupported auth type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool definition
// ---------------------------------------------------------------------------

/// A persisted external tool: one HTTP-callable capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub endpoint_url: String,
    /// `None` when the stored method is absent or unrecognised.
    pub http_method: Option<HttpMethod>,
    pub auth_type: AuthType,
    /// JSON document whose shape depends on `auth_type`.
    pub auth_config: Option<String>,
    /// Body template with `{{param}}` placeholders.
    pub request_template: Option<String>,
    /// JSON document, e.g. `{"extract": "/result"}`.
    pub response_mapping: Option<String>,
    pub is_active: bool,
    pub tool_type: String,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ToolDefinition {
    /// A fresh, active, unauthenticated GET tool with a new id.
    pub fn new(name: &str, endpoint_url: &str) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            description: String::new(),
            endpoint_url: endpoint_url.to_string(),
            http_method: Some(HttpMethod::Get),
            auth_type: AuthType::None,
            auth_config: None,
            request_template: None,
            response_mapping: None,
            is_active: true,
            tool_type: DEFAULT_TOOL_TYPE.into(),
            usage_count: 0,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat message exchanged with the completion model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}
