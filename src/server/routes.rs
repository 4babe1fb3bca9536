//! REST handlers for tool execution, administration and chat.

use super::error::ApiError;
use super::AppState;
use crate::tools::{ToolDraft, ToolView};
use crate::types::ToolParams;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// `POST /tools/{id}/execute`. The body is an optional JSON object of params.
pub async fn execute_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<String, ApiError> {
    let params = parse_params(&body)?;
    info!(tool_id = %id, params = params.len(), "Received execute request");
    Ok(state.executor.execute(&id, &params).await?)
}

fn parse_params(body: &[u8]) -> Result<ToolParams, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ToolParams::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Parameters must be a JSON object: {e}")))
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

pub async fn create_tool(
    State(state): State<AppState>,
    Json(draft): Json<ToolDraft>,
) -> Result<(StatusCode, Json<ToolView>), ApiError> {
    let view = state.catalog.save(draft).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_tools(State(state): State<AppState>) -> Result<Json<Vec<ToolView>>, ApiError> {
    Ok(Json(state.catalog.list_active().await?))
}

pub async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToolView>, ApiError> {
    Ok(Json(state.catalog.get(&id).await?))
}

pub async fn update_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<ToolDraft>,
) -> Result<Json<ToolView>, ApiError> {
    Ok(Json(state.catalog.update(&id, draft).await?))
}

pub async fn delete_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tools_by_type(
    State(state): State<AppState>,
    Path(tool_type): Path<String>,
) -> Result<Json<Vec<ToolView>>, ApiError> {
    Ok(Json(state.catalog.list_by_type(&tool_type).await?))
}

#[derive(Debug, Deserialize)]
pub struct RestWrapperRequest {
    pub url: String,
    pub name: String,
}

pub async fn create_rest_wrapper(
    State(state): State<AppState>,
    Json(req): Json<RestWrapperRequest>,
) -> Result<(StatusCode, Json<ToolView>), ApiError> {
    let view = state.catalog.create_rest_wrapper(&req.url, &req.name).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessedMessage {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

pub async fn process_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<ProcessedMessage>, ApiError> {
    let content = state.pipeline.process_incoming_message(&req.message).await?;
    Ok(Json(ProcessedMessage { content }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("message cannot be empty"));
    }
    let reply = state.pipeline.send_chat_turn(&req.message).await?;
    Ok(Json(ChatReply { reply }))
}
