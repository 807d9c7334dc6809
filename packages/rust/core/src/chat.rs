//! Minimal single-step Chat graph.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const WELCOME: &str = "Welcome to the Act!";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInput {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOutput {
    pub messages: String,
}

/// The graph's only step. Ignores the query.
fn sample(input: &ChatInput) -> ChatOutput {
    debug!(query = %input.query, "chat sample step");
    ChatOutput {
        messages: WELCOME.to_string(),
    }
}

pub fn run_chat(input: &ChatInput) -> ChatOutput {
    sample(input)
}
