//! The core agent loop of LocalPilot.
//!
//! Each request follows the same cycle:
//!
//! 1. **Assemble** context from the referenced files into a bounded window
//! 2. **Fit** the request to the token budget (truncate or condense)
//! 3. **Send** the history to the model
//! 4. **If tool calls**: run them in order, append results, loop back to 3
//! 5. **If text**: return it as the final answer
//!
//! The loop ends on a text answer, at the turn limit, or on cancellation.

pub mod bridge;
pub mod context;
pub mod interpreter;
pub mod loop_runner;
pub mod progress;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use bridge::ToolBridge;
pub use context::{
    BudgetStatus, CharHeuristic, ContextAssembler, ContextItem, MasterContext, TokenBudget,
    TokenCounter, TokenManager, estimate_tokens,
};
pub use interpreter::{EMPTY_RESPONSE_NOTICE, ModelReply};
pub use loop_runner::{AgentLoop, AgentOptions, CANCELLED_MESSAGE};
pub use progress::{ProgressCallback, ProgressEvent};
