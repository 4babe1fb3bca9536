//! Chat completion via an OpenAI-compatible API.

use crate::config::CompletionConfig;
use crate::types::{ChatMessage, ChatRole};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Produces the model's reply to a conversation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for any `/v1/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| MessagePayload {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!("Completion request to model: {}", self.model);

        let mut builder = self.http.post(&url).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let resp = builder.send().await.context("Completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Completion failed ({}): {}", status, body);
        }

        let body: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse completion response")?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
