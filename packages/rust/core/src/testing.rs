//! Scripted collaborators shared by the step and controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use blogwriter_shared::{
    BlogWriterError, ContentFetcher, ImageProvider, ImageSource, LanguageModel, LlmProvider,
    PipelineState, Result, RunConfig, ScraperKind,
};

use crate::pipeline::Collaborators;

/// Model double answering from a fixed queue of responses.
///
/// Clones share the queue and the recorded prompts.
#[derive(Clone, Default)]
pub struct Script {
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Script {
    pub fn new(responses: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            prompts: Arc::default(),
        }
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for Script {
    async fn complete(&self, prompt: &str, _provider: LlmProvider, _temperature: f32) -> Result<String> {
        // Give concurrently polled runs a chance to interleave.
        tokio::task::yield_now().await;
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BlogWriterError::Model("script exhausted".into())))
    }
}

struct FixedPage(std::result::Result<String, String>);

#[async_trait]
impl ContentFetcher for FixedPage {
    async fn fetch(&self, _url: &str, _mode: ScraperKind) -> Result<String> {
        self.0.clone().map_err(BlogWriterError::Fetch)
    }
}

/// Image double returning one canned result and recording queries.
pub struct RecordingImages {
    result: std::result::Result<String, String>,
    queries: Mutex<Vec<String>>,
}

impl RecordingImages {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for RecordingImages {
    async fn generate_or_fetch(&self, query: &str, _provider: ImageProvider) -> Result<String> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result.clone().map_err(BlogWriterError::Image)
    }
}

pub struct TestDeps {
    pub handle: Collaborators,
    pub images: Arc<RecordingImages>,
}

fn build(script: Script, page: std::result::Result<String, String>, image: Result<String>) -> TestDeps {
    let images = Arc::new(RecordingImages {
        result: image.map_err(|e| e.to_string()),
        queries: Mutex::default(),
    });
    TestDeps {
        handle: Collaborators {
            fetcher: Arc::new(FixedPage(page)),
            model: Arc::new(script),
            images: images.clone(),
        },
        images,
    }
}

/// Collaborators serving `page` for every fetch.
pub fn collaborators(script: Script, page: String, image: Result<String>) -> TestDeps {
    build(script, Ok(page), image)
}

/// Collaborators whose fetcher always fails with `message`.
pub fn failing_fetch(script: Script, message: &str) -> TestDeps {
    build(script, Err(message.to_string()), Ok(String::new()))
}

/// A fresh state for `https://example.com`, adjusted by `edit`.
pub fn state_with(edit: impl FnOnce(&mut PipelineState)) -> PipelineState {
    let mut state = PipelineState::new("https://example.com", None, RunConfig::default());
    edit(&mut state);
    state
}
