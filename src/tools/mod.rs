pub mod auth;
pub mod catalog;
pub mod directive;
pub mod dispatch;
pub mod mapping;
pub mod template;
pub mod traits;

pub use catalog::{ToolCatalog, ToolDraft, ToolView};
pub use directive::Directive;
pub use dispatch::{HttpDispatcher, OutboundRequest};
pub use traits::Dispatcher;

use crate::config::RelayConfig;
use crate::error::ToolError;
use crate::state::ToolStore;
use crate::types::{ToolDefinition, ToolParams};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Tool execution engine
// ---------------------------------------------------------------------------

/// Behaviour switches for [`ToolExecutor`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Fail the call when the auth config is missing or malformed instead
    /// of sending it unauthenticated.
    pub strict_auth: bool,
    /// Wrap directive results in the tool envelope.
    pub directive_envelope: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            strict_auth: false,
            directive_envelope: true,
        }
    }
}

/// Runs stored tools: lookup, render, authenticate, dispatch, map, count.
#[derive(Clone)]
pub struct ToolExecutor {
    store: Arc<dyn ToolStore>,
    dispatcher: Arc<dyn Dispatcher>,
    options: ExecutorOptions,
}

impl ToolExecutor {
    pub fn new(store: Arc<dyn ToolStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_options(store, dispatcher, ExecutorOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn ToolStore>,
        dispatcher: Arc<dyn Dispatcher>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            store,
            dispatcher,
            options,
        }
    }

    /// Executor over a real HTTP dispatcher configured from `config`.
    pub fn from_config(config: &RelayConfig, store: Arc<dyn ToolStore>) -> anyhow::Result<Self> {
        let dispatcher = HttpDispatcher::new(config.request_timeout())?;
        Ok(Self::with_options(
            store,
            Arc::new(dispatcher),
            ExecutorOptions {
                strict_auth: config.strict_auth,
                directive_envelope: config.directive_envelope,
            },
        ))
    }

    /// Execute the tool stored under `id` with caller-supplied parameters.
    pub async fn execute(&self, id: &str, params: &ToolParams) -> Result<String, ToolError> {
        let tool = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ToolError::NotFound(id.to_string()))?;
        self.run(&tool, params).await
    }

    /// Execute a tool named in a chat directive.
    ///
    /// The name is matched case-insensitively. The directive text is passed
    /// as `input` along with the MCP context flags.
    pub async fn execute_from_directive(
        &self,
        tool_name: &str,
        input: &str,
    ) -> Result<String, ToolError> {
        let tool = self
            .store
            .find_by_name(tool_name)
            .await?
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        let params = directive_params(input);
        let result = self.run(&tool, &params).await?;

        if self.options.directive_envelope {
            Ok(directive::wrap_result(&tool, input, &result))
        } else {
            Ok(result)
        }
    }

    async fn run(&self, tool: &ToolDefinition, params: &ToolParams) -> Result<String, ToolError> {
        if !tool.is_active {
            warn!("Refusing to execute inactive tool '{}'", tool.name);
            return Err(ToolError::Inactive(tool.name.clone()));
        }

        let body = template::render(tool.request_template.as_deref(), params);

        let mut headers = HeaderMap::new();
        if self.options.strict_auth {
            let auth = auth::resolve_auth(tool.auth_type, tool.auth_config.as_deref())
                .map_err(|e| {
                    ToolError::Configuration(format!(
                        "{} auth for tool '{}': {}",
                        tool.auth_type, tool.name, e
                    ))
                })?;
            headers.extend(auth);
        } else {
            auth::apply_auth(
                &mut headers,
                &tool.name,
                tool.auth_type,
                tool.auth_config.as_deref(),
            );
        }

        let request = OutboundRequest::build(tool, params, body, headers)?;
        info!("Executing tool '{}': {} {}", tool.name, request.method, request.url);

        let raw = match self.dispatcher.dispatch(request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Tool '{}' failed: {}", tool.name, e);
                return Err(e);
            }
        };

        let result = mapping::map_response(&raw, tool.response_mapping.as_deref());

        // Usage bookkeeping never fails the call.
        if let Err(e) = self.store.record_usage(&tool.id).await {
            warn!("Failed to record usage for tool '{}': {:#}", tool.name, e);
        }

        info!("Tool '{}' completed ({} bytes)", tool.name, result.len());
        Ok(result)
    }
}

/// Parameters handed to a tool invoked from a chat directive.
fn directive_params(input: &str) -> ToolParams {
    let mut params = ToolParams::new();
    params.insert("input".into(), Value::String(input.to_string()));
    params.insert("mcp_enabled".into(), Value::Bool(true));
    params.insert("mcp_context_expansion".into(), Value::Bool(true));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SqliteToolStore;
    use crate::types::{AuthType, HttpMethod};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Records every request and replays scripted responses in order.
    #[derive(Default)]
    struct ScriptedDispatcher {
        requests: StdMutex<Vec<OutboundRequest>>,
        responses: StdMutex<VecDeque<Result<String, ToolError>>>,
    }

    impl ScriptedDispatcher {
        fn replying(responses: Vec<Result<String, ToolError>>) -> Arc<Self> {
            Arc::new(Self {
                requests: StdMutex::new(Vec::new()),
                responses: StdMutex::new(responses.into()),
            })
        }

        fn requests(&self) -> Vec<OutboundRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn dispatch(&self, request: OutboundRequest) -> Result<String, ToolError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    async fn setup(
        tool: ToolDefinition,
        responses: Vec<Result<String, ToolError>>,
    ) -> (ToolExecutor, SqliteToolStore, Arc<ScriptedDispatcher>, ToolDefinition) {
        let store = SqliteToolStore::in_memory().unwrap();
        let tool = store.save(tool).await.unwrap();
        let dispatcher = ScriptedDispatcher::replying(responses);
        let executor = ToolExecutor::new(Arc::new(store.clone()), dispatcher.clone());
        (executor, store, dispatcher, tool)
    }

    fn params(value: Value) -> ToolParams {
        value.as_object().cloned().unwrap()
    }

    async fn usage(store: &SqliteToolStore, id: &str) -> u64 {
        store.find_by_id(id).await.unwrap().unwrap().usage_count
    }

    #[tokio::test]
    async fn successful_execution_maps_and_counts_once() {
        let mut tool = ToolDefinition::new("Search", "https://api.example.com/search");
        tool.http_method = Some(HttpMethod::Post);
        tool.request_template = Some(r#"{"query": "{{q}}"}"#.into());
        tool.response_mapping = Some(r#"{"extract": "/result"}"#.into());
        let (executor, store, dispatcher, tool) =
            setup(tool, vec![Ok(r#"{"result":"found it"}"#.into())]).await;

        let out = executor
            .execute(&tool.id, &params(json!({"q": "rust"})))
            .await
            .unwrap();

        assert_eq!(out, "found it");
        let sent = dispatcher.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"query": "rust"}"#));
        assert_eq!(usage(&store, &tool.id).await, 1);

        let loaded = store.find_by_id(&tool.id).await.unwrap().unwrap();
        assert!(loaded.last_used_at.is_some());
    }

    #[tokio::test]
    async fn get_tools_send_params_as_query() {
        let tool = ToolDefinition::new("Weather", "https://api.example.com/weather");
        let (executor, _store, dispatcher, tool) = setup(tool, vec![Ok("sunny".into())]).await;

        let out = executor
            .execute(&tool.id, &params(json!({"city": "Paris"})))
            .await
            .unwrap();

        assert_eq!(out, "sunny");
        let sent = dispatcher.requests();
        assert_eq!(sent[0].url.as_str(), "https://api.example.com/weather?city=Paris");
        assert!(sent[0].body.is_none());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let tool = ToolDefinition::new("Weather", "https://api.example.com/weather");
        let (executor, _store, dispatcher, _tool) = setup(tool, vec![]).await;

        let err = executor.execute("nope", &ToolParams::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref id) if id == "nope"));
        assert!(dispatcher.requests().is_empty());
    }

    #[tokio::test]
    async fn inactive_tool_is_never_dispatched() {
        let mut tool = ToolDefinition::new("Dormant", "https://api.example.com");
        tool.is_active = false;
        let (executor, store, dispatcher, tool) = setup(tool, vec![Ok("x".into())]).await;

        let err = executor.execute(&tool.id, &ToolParams::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Inactive(_)));
        assert!(dispatcher.requests().is_empty());
        assert_eq!(usage(&store, &tool.id).await, 0);
    }

    #[tokio::test]
    async fn failed_dispatch_does_not_count_usage() {
        let tool = ToolDefinition::new("Flaky", "https://api.example.com");
        let (executor, store, _dispatcher, tool) = setup(
            tool,
            vec![Err(ToolError::Status {
                code: 503,
                body: "down".into(),
            })],
        )
        .await;

        let err = executor.execute(&tool.id, &ToolParams::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Status { code: 503, .. }));
        assert_eq!(usage(&store, &tool.id).await, 0);
    }

    /// Never answers within a test's lifetime.
    #[derive(Default)]
    struct StalledDispatcher {
        started: AtomicBool,
    }

    #[async_trait]
    impl Dispatcher for StalledDispatcher {
        async fn dispatch(&self, _request: OutboundRequest) -> Result<String, ToolError> {
            self.started.store(true, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn abandoned_execution_does_not_count_usage() {
        let store = SqliteToolStore::in_memory().unwrap();
        let tool = store
            .save(ToolDefinition::new("Slow", "https://api.example.com/slow"))
            .await
            .unwrap();
        let dispatcher = Arc::new(StalledDispatcher::default());
        let executor = ToolExecutor::new(Arc::new(store.clone()), dispatcher.clone());

        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            executor.execute(&tool.id, &ToolParams::new()),
        )
        .await;

        assert!(outcome.is_err(), "execution should have been abandoned");
        assert!(dispatcher.started.load(Ordering::SeqCst));
        let loaded = store.find_by_id(&tool.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 0);
        assert!(loaded.last_used_at.is_none());
    }

    #[tokio::test]
    async fn unsupported_method_fails_before_dispatch() {
        let mut tool = ToolDefinition::new("Odd", "https://api.example.com");
        tool.http_method = None;
        let (executor, store, dispatcher, tool) = setup(tool, vec![]).await;

        let err = executor.execute(&tool.id, &ToolParams::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Configuration(_)));
        assert!(dispatcher.requests().is_empty());
        assert_eq!(usage(&store, &tool.id).await, 0);
    }

    #[tokio::test]
    async fn malformed_auth_is_skipped_by_default() {
        let mut tool = ToolDefinition::new("Keyed", "https://api.example.com");
        tool.auth_type = AuthType::BearerToken;
        tool.auth_config = Some("{not json".into());
        let (executor, _store, dispatcher, tool) = setup(tool, vec![Ok("ok".into())]).await;

        assert_eq!(executor.execute(&tool.id, &ToolParams::new()).await.unwrap(), "ok");
        assert!(dispatcher.requests()[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn strict_auth_rejects_malformed_config() {
        let store = SqliteToolStore::in_memory().unwrap();
        let mut tool = ToolDefinition::new("Keyed", "https://api.example.com");
        tool.auth_type = AuthType::ApiKey;
        tool.auth_config = Some(r#"{"headerName":"X-Key"}"#.into());
        let tool = store.save(tool).await.unwrap();
        let dispatcher = ScriptedDispatcher::replying(vec![Ok("ok".into())]);
        let executor = ToolExecutor::with_options(
            Arc::new(store),
            dispatcher.clone(),
            ExecutorOptions {
                strict_auth: true,
                directive_envelope: true,
            },
        );

        let err = executor.execute(&tool.id, &ToolParams::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Configuration(_)));
        assert!(dispatcher.requests().is_empty());
    }

    #[tokio::test]
    async fn auth_headers_are_attached() {
        let mut tool = ToolDefinition::new("Keyed", "https://api.example.com");
        tool.auth_type = AuthType::ApiKey;
        tool.auth_config = Some(r#"{"apiKey":"secret"}"#.into());
        let (executor, _store, dispatcher, tool) = setup(tool, vec![Ok("ok".into())]).await;

        executor.execute(&tool.id, &ToolParams::new()).await.unwrap();
        assert_eq!(dispatcher.requests()[0].headers["x-api-key"], "secret");
    }

    #[tokio::test]
    async fn directive_lookup_ignores_case_and_wraps_json() {
        let mut tool = ToolDefinition::new("Weather", "https://api.example.com/weather");
        tool.http_method = Some(HttpMethod::Post);
        tool.request_template = Some(r#"{"q": "{{input}}"}"#.into());
        let (executor, store, dispatcher, tool) =
            setup(tool, vec![Ok(r#"{"temp":21}"#.into())]).await;

        let out = executor
            .execute_from_directive("weather", "Paris")
            .await
            .unwrap();

        let envelope: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(envelope["tool_name"], "Weather");
        assert_eq!(envelope["input"], "Paris");
        assert_eq!(envelope["result"]["temp"], 21);
        assert_eq!(envelope["mcp_version"], directive::ENVELOPE_VERSION);
        assert_eq!(
            dispatcher.requests()[0].body.as_deref(),
            Some(r#"{"q": "Paris"}"#)
        );
        assert_eq!(usage(&store, &tool.id).await, 1);
    }

    #[tokio::test]
    async fn directive_params_carry_mcp_flags() {
        let tool = ToolDefinition::new("Lookup", "https://api.example.com/lookup");
        let (executor, _store, dispatcher, _tool) = setup(tool, vec![Ok("plain".into())]).await;

        let out = executor.execute_from_directive("Lookup", "abc").await.unwrap();
        assert_eq!(out, "MCP Tool Result [Lookup]:\nplain");

        let url = dispatcher.requests()[0].url.clone();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("input".into(), "abc".into())));
        assert!(pairs.contains(&("mcp_enabled".into(), "true".into())));
        assert!(pairs.contains(&("mcp_context_expansion".into(), "true".into())));
    }

    #[tokio::test]
    async fn directive_envelope_can_be_disabled() {
        let store = SqliteToolStore::in_memory().unwrap();
        store
            .save(ToolDefinition::new("Echo", "https://api.example.com"))
            .await
            .unwrap();
        let dispatcher = ScriptedDispatcher::replying(vec![Ok("raw".into())]);
        let executor = ToolExecutor::with_options(
            Arc::new(store),
            dispatcher,
            ExecutorOptions {
                strict_auth: false,
                directive_envelope: false,
            },
        );

        assert_eq!(executor.execute_from_directive("echo", "hi").await.unwrap(), "raw");
    }

    #[tokio::test]
    async fn unknown_directive_tool_is_not_found() {
        let tool = ToolDefinition::new("Weather", "https://api.example.com");
        let (executor, _store, _dispatcher, _tool) = setup(tool, vec![]).await;

        let err = executor
            .execute_from_directive("Nonexistent", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref name) if name == "Nonexistent"));
    }
}
