//! Context and token management.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`token`] | Token estimation, budget thresholds, truncation |
//! | [`store`] | The session's master context, in priority order |
//! | [`assembler`] | File loading, per-file caps, the sliding window |

pub mod assembler;
pub mod store;
pub mod token;

pub use assembler::{ContextAssembler, ContextItem};
pub use store::{MasterContext, TASK_DESCRIPTION_KEY, context_key};
pub use token::{BudgetStatus, CharHeuristic, TokenBudget, TokenCounter, TokenManager, estimate_tokens};
