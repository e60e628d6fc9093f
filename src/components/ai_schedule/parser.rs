use serde_json::{Map, Value};
use tracing::warn;

/// Remove Markdown code fences (```` ``` ```` and ```` ```json ````, any case)
fn strip_code_fences(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find("```") {
        cleaned.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        if rest
            .get(..4)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
        {
            rest = &rest[4..];
        }
    }
    cleaned.push_str(rest);

    cleaned.trim().to_string()
}

/// Parse text that must hold a JSON object
fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turn raw completion text into a JSON object.
///
/// Fences are stripped, then the whole text is parsed, then the span from the
/// first `{` to the last `}`. When nothing parses an empty map is returned so
/// the caller can fall back to asking for clarification.
pub fn parse_assistant_content(raw: &str) -> Map<String, Value> {
    let cleaned = strip_code_fences(raw);

    let first_error = match parse_object(&cleaned) {
        Ok(map) => return map,
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            match parse_object(&cleaned[start..=end]) {
                Ok(map) => return map,
                Err(e) => warn!("Second parse attempt failed: {}", e),
            }
        }
    }

    warn!(
        "Model response could not be parsed as JSON ({}): {}",
        first_error, raw
    );
    Map::new()
}
