//! Request body rendering from `{{param}}` templates.

use crate::types::ToolParams;
use serde_json::Value;
use tracing::warn;

/// Text form of a parameter value: strings verbatim, null as empty,
/// everything else as its JSON representation.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a request body.
///
/// With no (or a blank) template the parameters are serialized as a JSON
/// object. Otherwise each `{{key}}` is replaced by its value; placeholders
/// without a matching parameter stay as they are.
pub fn render(template: Option<&str>, params: &ToolParams) -> String {
    let template = match template {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return serde_json::to_string(params).unwrap_or_else(|e| {
                warn!("Failed to serialize parameters to JSON: {}", e);
                "{}".into()
            });
        }
    };

    let mut rendered = template.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{{{key}}}}}");
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, &value_to_text(value));
        }
    }
    rendered
}
