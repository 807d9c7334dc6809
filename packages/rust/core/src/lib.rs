//! Pipeline orchestration for Blog Writer.
//!
//! This crate defines the eight-step blog pipeline, the structured-output
//! parsing its steps rely on, and the controller that runs a pipeline up to
//! its suspend point and resumes it later.

pub mod chat;
pub mod controller;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod steps;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatInput, ChatOutput, run_chat};
pub use controller::{Controller, RunHandle, RunInput};
pub use pipeline::{Collaborators, Pipeline, Step};
pub use progress::{ProgressReporter, SilentProgress};
