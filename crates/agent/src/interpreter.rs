//! Response interpreter: classifies raw model text.
//!
//! Local models do not wrap structured output consistently. A reply may be a
//! fenced `json` block, a bare object after some prose, or plain text. The
//! interpreter tries, in order:
//!
//! 1. the interior of the first fenced `json` block;
//! 2. a balanced `{...}` object whose first key is `thought` or `tool_calls`,
//!    found with a string- and escape-aware brace matcher;
//! 3. the empty-response sentinel for blank input.
//!
//! Anything that does not deserialize into an object carrying `thought` or
//! `tool_calls` is a plain-text answer. Parsing never fails.

use localpilot_core::tool::ToolCall;
use serde_json::Value;
use tracing::{debug, warn};

/// Returned to the caller in place of an empty model reply.
pub const EMPTY_RESPONSE_NOTICE: &str =
    "The model returned an empty response. Try rephrasing the request or check the model server.";

/// One model reply, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// A plain-text answer.
    Text(String),

    /// A structured reply. `tool_calls` may be empty.
    Structured {
        thought: Option<String>,
        tool_calls: Vec<ToolCall>,
    },

    /// Blank output. Distinct from a text answer so callers can retry.
    Empty,
}

impl ModelReply {
    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Structured { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// The readable text of this reply: the answer, the thought, or the
    /// empty-response notice.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(t) => t,
            Self::Structured { thought, .. } => thought.as_deref().unwrap_or(""),
            Self::Empty => EMPTY_RESPONSE_NOTICE,
        }
    }
}

/// Classify a raw model reply.
pub fn parse(raw: &str) -> ModelReply {
    let candidate = extract_fenced_json(raw).or_else(|| extract_anchored_object(raw));

    let Some(candidate) = candidate else {
        if raw.trim().is_empty() {
            return ModelReply::Empty;
        }
        return ModelReply::Text(raw.to_string());
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => from_value(value).unwrap_or_else(|| ModelReply::Text(raw.to_string())),
        Err(e) => {
            debug!(error = %e, "Structured candidate did not parse, treating as text");
            ModelReply::Text(raw.to_string())
        }
    }
}

/// Build a structured reply, or `None` when the object has neither a
/// `tool_calls` array nor a `thought`.
fn from_value(value: Value) -> Option<ModelReply> {
    let obj = value.as_object()?;

    let thought = obj
        .get("thought")
        .and_then(Value::as_str)
        .map(str::to_string);
    let calls = obj.get("tool_calls").and_then(Value::as_array);

    if thought.is_none() && calls.is_none() {
        return None;
    }

    let tool_calls = calls
        .map(|arr| {
            arr.iter()
                .enumerate()
                .map(|(i, c)| to_tool_call(i, c))
                .collect()
        })
        .unwrap_or_default();

    Some(ModelReply::Structured {
        thought,
        tool_calls,
    })
}

/// A call without a usable `name` keeps an empty name, so the bridge can
/// report it back to the model instead of it vanishing from the batch.
fn to_tool_call(index: usize, call: &Value) -> ToolCall {
    let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
    if name.trim().is_empty() {
        warn!(index, "Tool call without a name");
    }

    let id = match call.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("call_{}", index + 1),
    };

    let parameters = match call.get("parameters").or_else(|| call.get("arguments")) {
        // Some models send arguments as a JSON-encoded string.
        Some(Value::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        Some(v) => v.clone(),
        None => Value::Object(Default::default()),
    };

    ToolCall {
        id,
        name: name.to_string(),
        parameters,
    }
}

/// Interior of the first fenced block labelled `json`.
fn extract_fenced_json(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let open = lower.find("```json")?;
    let after_label = open + "```json".len();
    let body_start = match text[after_label..].find('\n') {
        Some(nl) => after_label + nl + 1,
        None => after_label,
    };
    let close = text[body_start..].find("```")?;
    let body = text[body_start..body_start + close].trim();
    (!body.is_empty()).then_some(body)
}

/// First balanced object that opens with a `thought` or `tool_calls` key.
fn extract_anchored_object(text: &str) -> Option<&str> {
    for (start, _) in text.match_indices('{') {
        let rest = text[start + 1..].trim_start();
        if rest.starts_with("\"thought\"") || rest.starts_with("\"tool_calls\"") {
            return find_json_end(&text[start..]).map(|end| &text[start..=start + end]);
        }
    }
    None
}

/// Byte index of the brace closing the object that opens at `json[0]`.
///
/// Braces inside double-quoted strings are ignored and backslash escapes are
/// honoured. Returns `None` if the depth never returns to zero.
pub fn find_json_end(json: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in json.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_whitespace_are_sentinel() {
        assert_eq!(parse(""), ModelReply::Empty);
        assert_eq!(parse("   \n\t"), ModelReply::Empty);
        assert!(parse("").is_empty_response());
        assert!(!parse("4").is_empty_response());
    }

    #[test]
    fn plain_text() {
        assert_eq!(parse("4"), ModelReply::Text("4".into()));
    }

    #[test]
    fn fenced_block_with_prefix() {
        let raw = "Sure.\n```json\n{\"thought\":\"read it\",\"tool_calls\":[{\"id\":\"1\",\"name\":\"read_file\",\"parameters\":{\"path\":\"a.rs\"}}]}\n```\n";
        let reply = parse(raw);
        let ModelReply::Structured {
            thought,
            tool_calls,
        } = reply
        else {
            panic!("expected structured reply");
        };
        assert_eq!(thought.as_deref(), Some("read it"));
        assert_eq!(
            tool_calls,
            vec![ToolCall {
                id: "1".into(),
                name: "read_file".into(),
                parameters: json!({"path": "a.rs"}),
            }]
        );
    }

    #[test]
    fn fenced_round_trip_preserves_calls() {
        let calls = vec![
            ToolCall {
                id: "a".into(),
                name: "write_file".into(),
                parameters: json!({"path": "x.txt", "content": "{ } [ ] \" \\"}),
            },
            ToolCall {
                id: "b".into(),
                name: "run_command".into(),
                parameters: json!({"command": "cargo test"}),
            },
        ];
        let payload = json!({"thought": "go", "tool_calls": calls});
        let raw = format!("```json\n{}\n```", serde_json::to_string_pretty(&payload).unwrap());
        assert_eq!(parse(&raw).tool_calls(), calls.as_slice());
    }

    #[test]
    fn bare_object_with_nested_braces_in_strings() {
        let raw = r#"{"thought":"ok","tool_calls":[{"id":"1","name":"x","parameters":{"a":"}"}}]} trailing text"#;
        let reply = parse(raw);
        let calls = reply.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters, json!({"a": "}"}));
    }

    #[test]
    fn matcher_finds_outer_brace() {
        let raw = r#"{"a":{"b":"}{"},"c":"\"}"} tail"#;
        let end = find_json_end(raw).unwrap();
        assert_eq!(&raw[end + 1..], " tail");
    }

    #[test]
    fn matcher_fails_on_unbalanced() {
        assert_eq!(find_json_end(r#"{"thought":"x","tool_calls":[{"#), None);
        assert_eq!(find_json_end(r#"{"a":"}"#), None);
    }

    #[test]
    fn unbalanced_object_is_text() {
        let raw = r#"Here: {"thought":"x","tool_calls":[{"name":"read_file""#;
        assert_eq!(parse(raw), ModelReply::Text(raw.into()));
    }

    #[test]
    fn malformed_fenced_json_falls_back_to_text() {
        let raw = "```json\n{\"thought\": oops}\n```";
        assert_eq!(parse(raw), ModelReply::Text(raw.into()));
    }

    #[test]
    fn unrelated_object_is_text() {
        let raw = "```json\n{\"name\": \"package\", \"version\": \"1.0\"}\n```";
        assert_eq!(parse(raw), ModelReply::Text(raw.into()));
    }

    #[test]
    fn thought_only_has_no_calls() {
        let reply = parse(r#"{"thought":"simple math","tool_calls":[]}"#);
        assert!(reply.tool_calls().is_empty());
        assert_eq!(reply.text(), "simple math");
    }

    #[test]
    fn missing_ids_and_string_arguments() {
        let raw = r#"{"tool_calls":[{"name":"task","arguments":"{\"action\":\"list\"}"},{"name":"task","parameters":{"action":"add","title":"t"}},{"parameters":{}}]}"#;
        let calls = parse(raw).tool_calls().to_vec();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].parameters, json!({"action": "list"}));
        assert_eq!(calls[1].id, "call_2");
        assert_eq!(calls[2].id, "call_3");
        assert_eq!(calls[2].name, "");
    }

    #[test]
    fn nameless_call_is_kept() {
        let raw = r#"{"thought":"reading a.rs","tool_calls":[{"id":"1","parameters":{"path":"a.rs"}}]}"#;
        let calls = parse(raw).tool_calls().to_vec();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "1");
        assert!(calls[0].name.is_empty());
        assert_eq!(calls[0].parameters, json!({"path": "a.rs"}));
    }

    #[test]
    fn uppercase_fence_label() {
        let raw = "```JSON\n{\"thought\":\"t\",\"tool_calls\":[]}\n```";
        assert!(matches!(parse(raw), ModelReply::Structured { .. }));
    }

    #[test]
    fn prose_with_unrelated_braces_is_text() {
        let raw = "Use a closure like |x| { x + 1 } to map values.";
        assert_eq!(parse(raw), ModelReply::Text(raw.into()));
    }
}
