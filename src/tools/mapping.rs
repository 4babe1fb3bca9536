//! Declarative extraction from raw tool responses.

use serde_json::Value;
use tracing::{debug, warn};

/// Apply a response mapping such as `{"extract": "/data/0/name"}`.
///
/// The `extract` path is a JSON Pointer. A string value comes back as plain
/// text, anything else as compact JSON. Without a mapping, or whenever the
/// mapping, the response or the path does not line up, the raw response is
/// returned unchanged.
pub fn map_response(raw: &str, mapping: Option<&str>) -> String {
    let mapping = match mapping {
        Some(m) if !m.trim().is_empty() => m,
        _ => return raw.to_string(),
    };

    let mapping: Value = match serde_json::from_str(mapping) {
        Ok(v) => v,
        Err(e) => {
            warn!("Ignoring unparseable response mapping: {}", e);
            return raw.to_string();
        }
    };

    let Some(path) = mapping.get("extract").and_then(Value::as_str) else {
        return raw.to_string();
    };

    let response: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Response is not JSON, returning raw response: {}", e);
            return raw.to_string();
        }
    };

    match response.pointer(path) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => {
            debug!("Extract path '{}' did not resolve, returning raw response", path);
            raw.to_string()
        }
    }
}
