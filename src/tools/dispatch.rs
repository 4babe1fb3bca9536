//! Outbound HTTP calls for external tools.

use crate::error::ToolError;
use crate::tools::template::value_to_text;
use crate::tools::traits::Dispatcher;
use crate::types::{HttpMethod, ToolDefinition, ToolParams};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use std::time::Duration;
use tracing::debug;

/// Body text reported for error responses that came back empty.
pub const UNKNOWN_ERROR_BODY: &str = "Unknown error";

/// A tool call ready to be sent.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl OutboundRequest {
    /// Assemble the request for `tool`.
    ///
    /// GET appends every parameter to the endpoint's query string and sends
    /// no body. POST/PUT/PATCH send `body` as JSON. DELETE sends nothing.
    /// A missing method or unparseable endpoint fails before any I/O.
    pub fn build(
        tool: &ToolDefinition,
        params: &ToolParams,
        body: String,
        auth_headers: HeaderMap,
    ) -> Result<Self, ToolError> {
        let method = tool.http_method.ok_or_else(|| {
            ToolError::Configuration(format!("Unsupported HTTP method for tool '{}'", tool.name))
        })?;

        let mut url = Url::parse(tool.endpoint_url.trim()).map_err(|e| {
            ToolError::Configuration(format!(
                "Invalid endpoint URL for tool '{}': {}",
                tool.name, e
            ))
        })?;

        if method == HttpMethod::Get && !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, &value_to_text(value));
            }
        }

        let mut headers = auth_headers;
        let body = if method.carries_body() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Some(body)
        } else {
            None
        };

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
    }
}

/// [`Dispatcher`] over a shared `reqwest` client with a single deadline.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpDispatcher {
    /// Create a dispatcher whose calls fail after `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout(self.timeout)
        } else {
            ToolError::Transport(err.to_string())
        }
    }

    async fn send(&self, request: OutboundRequest) -> Result<String, ToolError> {
        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;

        if status.as_u16() >= 400 {
            let body = if body.is_empty() {
                UNKNOWN_ERROR_BODY.to_string()
            } else {
                body
            };
            return Err(ToolError::Status {
                code: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, request: OutboundRequest) -> Result<String, ToolError> {
        debug!("Dispatching {} {}", request.method, request.url);
        tokio::time::timeout(self.timeout, self.send(request))
            .await
            .map_err(|_| ToolError::Timeout(self.timeout))?
    }
}
