//! Dispatch seam between the executor and the network.

use crate::error::ToolError;
use crate::tools::dispatch::OutboundRequest;
use async_trait::async_trait;

/// Sends a fully built tool request and returns the response body.
///
/// Implementations classify failures as `Timeout`, `Transport` or `Status`.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: OutboundRequest) -> Result<String, ToolError>;
}
