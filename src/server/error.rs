use crate::chat::ChatError;
use crate::error::ToolError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// JSON body of every failed API call.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

/// Error returned from handlers, rendered as a status plus [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                kind: "bad_request",
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for a tool failure.
///
/// Remote status errors are passed through when they are a real 4xx/5xx.
pub fn tool_error_status(err: &ToolError) -> StatusCode {
    match err {
        ToolError::NotFound(_) => StatusCode::NOT_FOUND,
        ToolError::Inactive(_) | ToolError::DuplicateName(_) => StatusCode::CONFLICT,
        ToolError::Configuration(_) => StatusCode::BAD_REQUEST,
        ToolError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ToolError::Transport(_) => StatusCode::BAD_GATEWAY,
        ToolError::Status { code, .. } => StatusCode::from_u16(*code)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
        ToolError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        if err.is_dispatch_failure() {
            warn!(kind = err.kind(), "Upstream tool call failed: {}", err);
        }
        Self {
            status: tool_error_status(&err),
            body: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Tool(e) => e.into(),
            other @ ChatError::Completion(_) => Self {
                status: StatusCode::BAD_GATEWAY,
                body: ErrorBody {
                    kind: "completion",
                    message: other.to_string(),
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = self.body.kind, "{}", self.body.message);
        }
        (self.status, Json(self.body)).into_response()
    }
}
