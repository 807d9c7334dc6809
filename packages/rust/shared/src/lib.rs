//! Shared types, error model, and configuration for Blog Writer.
//!
//! This crate is the foundation depended on by all other Blog Writer crates.
//! It provides:
//! - [`BlogWriterError`], the unified error type
//! - Domain types ([`RunId`], [`RunStatus`], [`PipelineState`], provider selectors)
//! - Collaborator traits ([`ContentFetcher`], [`LanguageModel`], [`ImageSource`], [`RunStore`])
//! - Configuration ([`AppConfig`], config loading)

pub mod adapters;
pub mod config;
pub mod error;
pub mod state;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use adapters::{ContentFetcher, ImageSource, LanguageModel, RunStore};
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, ImagesConfig, ProviderConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from, read_api_key,
    validate_api_key,
};
pub use error::{BlogWriterError, Result};
pub use state::{PipelineOutput, PipelineState, StatePatch, StateUpdate};
pub use types::{
    AnalyzedContent, DEFAULT_TEMPERATURE, ImageProvider, LlmProvider, RunConfig, RunId,
    RunRecord, RunStatus, ScraperKind, SeoMeta, StepName,
};
