//! Tool execution bridge between model tool calls and the tool gateway.
//!
//! Every call resolves to a [`ToolResult`]. Unknown tools, parameters that
//! fail schema validation, and tool errors all become error results that the
//! model sees on its next turn.

use std::sync::Arc;

use localpilot_core::message::Conversation;
use localpilot_core::tool::{
    ToolCall, ToolDefinition, ToolGateway, ToolResult, validate_parameters,
};
use tracing::{debug, warn};

use crate::context::{MasterContext, context_key};

pub struct ToolBridge {
    gateway: Arc<dyn ToolGateway>,
    /// Fixed for the bridge's lifetime, like the system prompt built from it.
    definitions: Vec<ToolDefinition>,
}

impl ToolBridge {
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        let definitions = gateway.definitions();
        Self {
            gateway,
            definitions,
        }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Validate and run one call without touching session state.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        if call.name.trim().is_empty() {
            warn!(id = %call.id, "Model sent a tool call without a name");
            return ToolResult::error(
                &call.id,
                "Tool call is missing a name. Each entry in tool_calls needs \"name\" and \"parameters\".",
            );
        }

        let Some(definition) = self.definitions.iter().find(|d| d.name == call.name) else {
            warn!(tool = %call.name, "Model requested unknown tool");
            return ToolResult::error(&call.id, format!("Unknown tool: {}", call.name));
        };

        if let Err(e) = validate_parameters(&definition.parameters, &call.parameters) {
            debug!(tool = %call.name, error = %e, "Rejected tool call parameters");
            return ToolResult::error(&call.id, e.to_string());
        }

        match self.gateway.execute(call).await {
            Ok(mut result) => {
                result.call_id = call.id.clone();
                result
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::error(&call.id, e.to_string())
            }
        }
    }

    /// Run one call and record the outcome.
    ///
    /// The result is appended to `conversation`. A successful result that
    /// carries file content is also stored in `master` under the file's
    /// context key.
    pub async fn execute(
        &self,
        call: &ToolCall,
        conversation: &mut Conversation,
        master: &mut MasterContext,
    ) -> ToolResult {
        let result = self.dispatch(call).await;

        conversation.append_tool_result(&call.id, &result);
        if result.is_success()
            && let Some(path) = &result.file_path
        {
            master.insert(context_key(path), result.output.clone());
            debug!(path = %path, "Folded file content into master context");
        }
        result
    }
}
