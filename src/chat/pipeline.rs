//! Inbound message handling: resolve directives, then talk to the model.

use crate::chat::completion::CompletionClient;
use crate::error::ToolError;
use crate::tools::{directive, ToolExecutor};
use crate::types::ChatMessage;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// A failed chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Completion failed: {0:#}")]
    Completion(anyhow::Error),
}

/// Runs each chat message through the tool engine before the model sees it.
#[derive(Clone)]
pub struct MessagePipeline {
    executor: ToolExecutor,
    completion: Arc<dyn CompletionClient>,
}

impl MessagePipeline {
    pub fn new(executor: ToolExecutor, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            executor,
            completion,
        }
    }

    /// Replace a message carrying a tool directive with the tool's result.
    ///
    /// Messages without a directive come back unchanged; blank messages come
    /// back empty. A tool failure is returned as-is.
    pub async fn process_incoming_message(&self, message: &str) -> Result<String, ToolError> {
        if message.trim().is_empty() {
            return Ok(String::new());
        }

        let Some(found) = directive::detect(message) else {
            debug!("No tool directive in message");
            return Ok(message.to_string());
        };

        info!("Tool directive detected: {}", found.tool_name);
        self.executor
            .execute_from_directive(&found.tool_name, &found.input)
            .await
    }

    /// Process `message` and forward the result to the model as a user turn.
    pub async fn send_chat_turn(&self, message: &str) -> Result<String, ChatError> {
        let content = self.process_incoming_message(message).await?;
        self.completion
            .complete(&[ChatMessage::user(content)])
            .await
            .map_err(ChatError::Completion)
    }
}
