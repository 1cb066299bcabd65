//! System prompt construction.

use localpilot_core::tool::ToolDefinition;

const BASE_PROMPT: &str = "You are LocalPilot, a coding agent running inside the user's editor against a locally hosted model. You read and change the user's workspace through tools.

When you receive a request:
1. Work out what needs to be done.
2. Call the tools you need, one step at a time.
3. Read tool results carefully before deciding the next step.
4. If something keeps failing, try a different approach.
5. When the task is complete, answer in plain text.

Prefer small, targeted edits over rewriting whole files. Read a file before editing it.";

const REPLY_PROTOCOL: &str = "# Reply format

To use tools, reply with exactly one fenced json block:

```json
{
  \"thought\": \"why these calls are the next step\",
  \"tool_calls\": [
    {\"id\": \"1\", \"name\": \"read_file\", \"parameters\": {\"path\": \"src/main.rs\"}}
  ]
}
```

Every call needs a unique `id`, a tool `name` from the list above, and a `parameters` object matching that tool's schema. Calls run in the order listed and each result is returned to you before your next reply.

When you are done, reply with plain text only and no json block. That text is shown to the user as your final answer.";

/// Summarization instruction used when the context block is condensed.
pub const CONDENSE_PROMPT: &str = "Summarize the following context for a coding agent. Keep file paths, identifiers, signatures and anything the task depends on. Drop boilerplate. Reply with the summary only.";

/// Final request sent when the turn limit is reached.
pub const TURN_LIMIT_PROMPT: &str = "You have reached the turn limit for this request. Do not call any more tools. Summarize in plain text what has been done so far and what remains.";

/// The full system prompt: base text, tool catalog, reply protocol.
pub fn build_system_prompt(override_base: Option<&str>, tools: &[ToolDefinition]) -> String {
    let base = override_base.unwrap_or(BASE_PROMPT);
    let mut prompt = String::with_capacity(base.len() + REPLY_PROTOCOL.len() + 512);
    prompt.push_str(base);
    prompt.push_str("\n\n");
    prompt.push_str(&tool_catalog(tools));
    prompt.push_str(REPLY_PROTOCOL);
    prompt
}

fn tool_catalog(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return "# Tools\n\nNo tools are available. Answer in plain text.\n\n".to_string();
    }

    let mut out = String::from("# Tools\n\n");
    for tool in tools {
        out.push_str(&format!("## {}\n{}\n", tool.name, tool.description));
        // Schemas are generated by the tools themselves and always serialize.
        let schema = serde_json::to_string(&tool.parameters).unwrap_or_default();
        out.push_str(&format!("Parameters: {schema}\n\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.into(),
            description: format!("Does {name}"),
            parameters: json!({"type": "object", "properties": {"path": {"type": "string"}}}),
        }
    }

    #[test]
    fn catalog_lists_every_tool() {
        let prompt = build_system_prompt(None, &[def("read_file"), def("run_command")]);
        assert!(prompt.starts_with("You are LocalPilot"));
        assert!(prompt.contains("## read_file\nDoes read_file"));
        assert!(prompt.contains("## run_command"));
        assert!(prompt.contains(r#""path":{"type":"string"}"#));
        assert!(prompt.contains("tool_calls"));
    }

    #[test]
    fn override_replaces_base_only() {
        let prompt = build_system_prompt(Some("Be terse."), &[def("task")]);
        assert!(prompt.starts_with("Be terse.\n\n# Tools"));
        assert!(!prompt.contains("LocalPilot"));
        assert!(prompt.contains("# Reply format"));
    }

    #[test]
    fn no_tools() {
        let prompt = build_system_prompt(None, &[]);
        assert!(prompt.contains("No tools are available"));
    }
}
