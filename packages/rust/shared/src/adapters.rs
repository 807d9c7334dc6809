//! Narrow interfaces to the external collaborators the pipeline calls.
//!
//! Implementations live in the `fetch`, `llm`, `images` and `storage` crates;
//! tests substitute scripted doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ImageProvider, LlmProvider, RunId, RunRecord, ScraperKind};

/// Retrieves the readable text of a web page.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `url` and return its extracted text. Fails with `Fetch` on
    /// network or HTTP errors.
    async fn fetch(&self, url: &str, mode: ScraperKind) -> Result<String>;
}

/// Text completion against one of the supported model providers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`. Fails with `Model` on auth, quota or network errors.
    async fn complete(&self, prompt: &str, provider: LlmProvider, temperature: f32) -> Result<String>;
}

/// Produces an image URL for a prompt (generation) or query (stock search).
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Returns a URL, or an empty string when nothing was found.
    async fn generate_or_fetch(&self, query: &str, provider: ImageProvider) -> Result<String>;
}

/// Durable run records keyed by run id.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a new record. Fails with `RunExists` if the id is taken.
    async fn create(&self, record: &RunRecord) -> Result<()>;

    /// Overwrite an existing record.
    async fn save(&self, record: &RunRecord) -> Result<()>;

    /// Fails with `RunNotFound` for unknown ids.
    async fn load(&self, run_id: &RunId) -> Result<RunRecord>;

    /// Atomically move a suspended run to `Running` at its suspended step and
    /// return the updated record. At most one caller wins for a given id;
    /// the rest get `RunBusy`. Missing or terminal runs yield `RunNotFound`.
    async fn claim_suspended(&self, run_id: &RunId) -> Result<RunRecord>;

    /// All records, most recently updated first.
    async fn list(&self) -> Result<Vec<RunRecord>>;
}
