//! The fixed blog pipeline: eight steps in order, one suspend boundary.

use std::sync::Arc;

use async_trait::async_trait;

use blogwriter_shared::{
    ContentFetcher, ImageSource, LanguageModel, PipelineState, Result, StateUpdate, StepName,
};

use crate::steps::{
    AnalyzeContent, ConvertToHtml, FetchContent, GenerateImages, HumanSelectKeywords,
    OptimizeSeo, SuggestKeywords, WriteBlog,
};

/// External services the steps call. Built once at startup and shared by
/// every run.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub model: Arc<dyn LanguageModel>,
    pub images: Arc<dyn ImageSource>,
}

/// One unit of the pipeline.
///
/// A step reads the current state (which carries the run config) and
/// returns the fields it produces. It never mutates state directly.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> StepName;

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate>;
}

/// Ordered list of steps with an optional suspend boundary.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    /// Execution stops before this index until the run is resumed.
    suspend_before: Option<usize>,
}

impl Pipeline {
    /// The blog writer: fetch, analyse, suggest keywords, then pause before
    /// the human keyword selection; afterwards write, SEO, images and HTML.
    pub fn blog_writer() -> Self {
        Self {
            steps: vec![
                Box::new(FetchContent),
                Box::new(AnalyzeContent),
                Box::new(SuggestKeywords),
                Box::new(HumanSelectKeywords),
                Box::new(WriteBlog),
                Box::new(OptimizeSeo),
                Box::new(GenerateImages),
                Box::new(ConvertToHtml),
            ],
            suspend_before: Some(3),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&dyn Step> {
        self.steps.get(index).map(|s| s.as_ref())
    }

    pub fn index_of(&self, name: StepName) -> Option<usize> {
        self.steps.iter().position(|s| s.name() == name)
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Index of the suspend boundary, if any.
    pub fn boundary_index(&self) -> Option<usize> {
        self.suspend_before
    }

    /// The step execution pauses in front of.
    pub fn boundary(&self) -> Option<StepName> {
        self.suspend_before.and_then(|i| self.step(i)).map(|s| s.name())
    }
}
