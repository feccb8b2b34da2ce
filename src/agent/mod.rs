//! Agent module - the conversation orchestration loop.
//!
//! Each user turn follows a fixed shape:
//! 1. Append the user message and call the model with the tool schemas
//! 2. If the model answers in text, that is the turn's answer
//! 3. Otherwise run every requested tool in order and record the results
//! 4. Call the model once more, without tools, for the final answer

mod agent_loop;
mod prompt;

use std::time::Duration;

use thiserror::Error;

use crate::llm::ModelCallError;

pub use agent_loop::{Chat, TurnState, NO_RESPONSE_PLACEHOLDER};
pub use prompt::{build_system_prompt, DEFAULT_SYSTEM_PROMPT};

/// A failed turn. The transcript up to the failure is kept.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Model(#[from] ModelCallError),

    #[error("Turn abandoned after {0:?}")]
    TimedOut(Duration),
}
