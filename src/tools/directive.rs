//! Detection of `@{{ToolName}} input` directives in chat messages.

use crate::types::ToolDefinition;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

/// Envelope version stamped on wrapped directive results.
pub const ENVELOPE_VERSION: &str = "1.0";

/// A tool call embedded in a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Tool name as typed (lookup ignores case, parsing does not).
    pub tool_name: String,
    /// Trimmed text following the directive.
    pub input: String,
}

/// Regex for the `@{{Name}} input` directive.
static DIRECTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@\{\{([^}]+)\}\}\s*(.*)").expect("fail to create a regex for the tool directive")
});

/// Find the first directive in `message`.
///
/// The name stops at the first `}`; the input runs to the end of that line.
pub fn detect(message: &str) -> Option<Directive> {
    let captures = DIRECTIVE_PATTERN.captures(message)?;
    let tool_name = captures.get(1)?.as_str().trim().to_string();
    let input = captures
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Some(Directive { tool_name, input })
}

/// Wrap a directive result so the model can see which tool produced it.
///
/// JSON results are embedded as a `result` value; anything else gets a
/// plain-text header.
pub fn wrap_result(tool: &ToolDefinition, input: &str, result: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(result) {
        Ok(value) => json!({
            "tool_name": tool.name,
            "tool_type": tool.tool_type,
            "input": input,
            "result": value,
            "mcp_version": ENVELOPE_VERSION,
        })
        .to_string(),
        Err(_) => format!("MCP Tool Result [{}]:\n{}", tool.name, result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_has_no_directive() {
        assert_eq!(detect("what's the weather like in Paris?"), None);
        assert_eq!(detect("email me at someone@example.com"), None);
        assert_eq!(detect("@{Weather} Paris"), None);
        assert_eq!(detect(""), None);
    }

    #[test]
    fn extracts_name_and_residual() {
        let d = detect("@{{Weather}} Paris").unwrap();
        assert_eq!(d.tool_name, "Weather");
        assert_eq!(d.input, "Paris");
    }

    #[test]
    fn name_case_is_preserved() {
        let d = detect("@{{wEaThEr}} what's it like in Paris").unwrap();
        assert_eq!(d.tool_name, "wEaThEr");
        assert_eq!(d.input, "what's it like in Paris");
    }

    #[test]
    fn directive_may_appear_mid_message() {
        let d = detect("hey, @{{ Stock Quote }}   ACME  ").unwrap();
        assert_eq!(d.tool_name, "Stock Quote");
        assert_eq!(d.input, "ACME");
    }

    #[test]
    fn first_directive_wins() {
        let d = detect("@{{One}} a @{{Two}} b").unwrap();
        assert_eq!(d.tool_name, "One");
        assert_eq!(d.input, "a @{{Two}} b");
    }

    #[test]
    fn name_stops_at_first_closing_braces() {
        let d = detect("@{{Weather}}}} Rome").unwrap();
        assert_eq!(d.tool_name, "Weather");
        assert_eq!(d.input, "}} Rome");
    }

    #[test]
    fn bare_directive_has_empty_input() {
        let d = detect("@{{Ping}}").unwrap();
        assert_eq!(d.tool_name, "Ping");
        assert_eq!(d.input, "");
    }

    #[test]
    fn input_is_limited_to_the_directive_line() {
        let d = detect("@{{Search}} rust async\nsecond line").unwrap();
        assert_eq!(d.input, "rust async");
    }

    #[test]
    fn json_result_is_embedded() {
        let mut tool = ToolDefinition::new("Weather", "https://example.com");
        tool.tool_type = "API".into();
        let wrapped = wrap_result(&tool, "Paris", r#"{"temp":21}"#);

        let value: serde_json::Value = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(value["tool_name"], "Weather");
        assert_eq!(value["tool_type"], "API");
        assert_eq!(value["input"], "Paris");
        assert_eq!(value["result"]["temp"], 21);
        assert_eq!(value["mcp_version"], "1.0");
    }

    #[test]
    fn text_result_gets_a_header() {
        let tool = ToolDefinition::new("Echo", "https://example.com");
        assert_eq!(
            wrap_result(&tool, "hi", "plain words"),
            "MCP Tool Result [Echo]:\nplain words"
        );
    }
}
