//! HTTP API: tool execution, catalog administration and chat.

pub mod error;
pub mod routes;

pub use error::{ApiError, ServerError};

use crate::chat::MessagePipeline;
use crate::tools::{ToolCatalog, ToolExecutor};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub executor: ToolExecutor,
    pub catalog: ToolCatalog,
    pub pipeline: MessagePipeline,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tools", post(routes::create_tool).get(routes::list_tools))
        .route("/tools/rest-wrapper", post(routes::create_rest_wrapper))
        .route("/tools/type/{tool_type}", get(routes::list_tools_by_type))
        .route(
            "/tools/{id}",
            get(routes::get_tool)
                .put(routes::update_tool)
                .delete(routes::delete_tool),
        )
        .route("/tools/{id}/execute", post(routes::execute_tool))
        .route("/messages/process", post(routes::process_message))
        .route("/chat", post(routes::chat))
        .with_state(state)
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_on(state, listener, cancel).await
}

/// Serve on an already bound listener until `cancel` fires.
pub async fn serve_on(
    state: AppState,
    listener: TcpListener,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "REST server ready to accept connections");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(ServerError::Serve)
}
