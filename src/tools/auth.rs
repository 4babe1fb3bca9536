//! Outbound authentication headers per tool auth type.
//!
//! Config shapes (JSON):
//! - `API_KEY`: `{"apiKey": "...", "headerName": "X-API-Key"}` (header name optional)
//! - `BEARER_TOKEN`: `{"token": "..."}`
//! - `BASIC_AUTH`: `{"username": "...", "password": "..."}`
//! - `OAUTH2`: `{"accessToken": "..."}` (static token, no refresh)

use crate::types::AuthType;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Header used for API keys when the config does not name one.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Why an auth config could not be turned into headers.
#[derive(Debug, Error)]
pub enum AuthConfigError {
    #[error("auth config is missing")]
    Missing,
    #[error("auth config is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("auth config has no '{0}' field")]
    MissingField(&'static str),
    #[error("auth config produces an invalid header: {0}")]
    InvalidHeader(String),
}

/// Build the auth headers for a tool, failing on any config problem.
pub fn resolve_auth(
    auth_type: AuthType,
    auth_config: Option<&str>,
) -> Result<HeaderMap, AuthConfigError> {
    let mut headers = HeaderMap::new();
    if auth_type == AuthType::None {
        return Ok(headers);
    }

    let raw = auth_config
        .filter(|c| !c.trim().is_empty())
        .ok_or(AuthConfigError::Missing)?;
    let config: Value = serde_json::from_str(raw)?;

    match auth_type {
        AuthType::None => {}
        AuthType::ApiKey => {
            let key = field(&config, "apiKey")?;
            let name = match config.get("headerName") {
                Some(Value::Null) | None => DEFAULT_API_KEY_HEADER.to_string(),
                Some(_) => field(&config, "headerName")?,
            };
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AuthConfigError::InvalidHeader(name.clone()))?;
            headers.insert(name, sensitive(&key)?);
        }
        AuthType::BearerToken => {
            let token = field(&config, "token")?;
            headers.insert(AUTHORIZATION, sensitive(&format!("Bearer {token}"))?);
        }
        AuthType::BasicAuth => {
            let username = field(&config, "username")?;
            let password = field(&config, "password")?;
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            headers.insert(AUTHORIZATION, sensitive(&format!("Basic {encoded}"))?);
        }
        AuthType::Oauth2 => {
            let token = field(&config, "accessToken")?;
            headers.insert(AUTHORIZATION, sensitive(&format!("Bearer {token}"))?);
        }
    }

    Ok(headers)
}

/// Add auth headers to `headers`, skipping them (with a warning) when the
/// config is missing or malformed. The call then goes out unauthenticated.
pub fn apply_auth(
    headers: &mut HeaderMap,
    tool_name: &str,
    auth_type: AuthType,
    auth_config: Option<&str>,
) {
    match resolve_auth(auth_type, auth_config) {
        Ok(auth) => headers.extend(auth),
        Err(e) => warn!(
            "Skipping {} auth for tool '{}': {}",
            auth_type, tool_name, e
        ),
    }
}

fn field(config: &Value, name: &'static str) -> Result<String, AuthConfigError> {
    match config.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(AuthConfigError::MissingField(name)),
    }
}

fn sensitive(value: &str) -> Result<HeaderValue, AuthConfigError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| AuthConfigError::InvalidHeader("non-visible characters in value".into()))?;
    value.set_sensitive(true);
    Ok(value)
}
