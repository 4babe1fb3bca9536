//! Default tools registered on first start.

use crate::state::ToolStore;
use crate::tools::auth::DEFAULT_API_KEY_HEADER;
use crate::types::{AuthType, HttpMethod, ToolDefinition, DEFAULT_TOOL_TYPE};
use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};

pub const WEATHER_TOOL_NAME: &str = "Weather";
pub const WEATHER_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Register the Weather tool unless a tool with that name already exists.
///
/// Returns `true` when the tool was inserted.
pub async fn ensure_weather_tool(store: &dyn ToolStore, api_key: &str) -> Result<bool> {
    if store.find_by_name(WEATHER_TOOL_NAME).await?.is_some() {
        info!("Weather tool already registered");
        return Ok(false);
    }

    if api_key.trim().is_empty() {
        warn!("No OpenWeather API key configured; the Weather tool will be rejected upstream");
    }

    let mut tool = ToolDefinition::new(WEATHER_TOOL_NAME, WEATHER_ENDPOINT);
    tool.description = "Get current weather information for a city".into();
    tool.http_method = Some(HttpMethod::Get);
    tool.auth_type = AuthType::ApiKey;
    tool.auth_config = Some(
        json!({
            "apiKey": api_key,
            "headerName": DEFAULT_API_KEY_HEADER,
        })
        .to_string(),
    );
    tool.request_template = Some("?q={{city}}&units=metric".into());
    tool.tool_type = DEFAULT_TOOL_TYPE.into();

    store.save(tool).await?;
    info!("Registered Weather tool");
    Ok(true)
}
