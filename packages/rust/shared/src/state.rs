//! The pipeline state threaded through every step.
//!
//! Each step returns a [`StateUpdate`] that the controller merges with
//! [`PipelineState::apply`]. Fields are write-once: a step may repeat a value
//! that is already present, but never change it.

use serde::{Deserialize, Serialize};

use crate::error::{BlogWriterError, Result};
use crate::types::{AnalyzedContent, RunConfig, SeoMeta};

/// Accumulated state of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub url: String,
    #[serde(default)]
    pub user_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub run_config: RunConfig,

    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub analyzed_content: Option<AnalyzedContent>,
    #[serde(default)]
    pub suggested_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub selected_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub blog_markdown: Option<String>,
    #[serde(default)]
    pub seo_meta: Option<SeoMeta>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub html_content: Option<String>,
}

/// Partial update produced by one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub raw_content: Option<String>,
    pub analyzed_content: Option<AnalyzedContent>,
    pub suggested_keywords: Option<Vec<String>>,
    pub selected_keywords: Option<Vec<String>>,
    pub blog_markdown: Option<String>,
    pub seo_meta: Option<SeoMeta>,
    pub image_urls: Option<Vec<String>>,
    pub html_content: Option<String>,
}

fn check_slot<T: PartialEq>(slot: &Option<T>, value: &Option<T>, field: &'static str) -> Result<()> {
    match (slot, value) {
        (Some(current), Some(new)) if current != new => {
            Err(BlogWriterError::StateConflict { field })
        }
        _ => Ok(()),
    }
}

fn fill_slot<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl PipelineState {
    /// Initial state for a new run.
    pub fn new(url: impl Into<String>, user_keywords: Option<Vec<String>>, run_config: RunConfig) -> Self {
        Self {
            url: url.into(),
            user_keywords,
            run_config,
            ..Self::default()
        }
    }

    /// Merge a step's update. Either every field is applied or none is.
    pub fn apply(&mut self, update: StateUpdate) -> Result<()> {
        check_slot(&self.raw_content, &update.raw_content, "raw_content")?;
        check_slot(&self.analyzed_content, &update.analyzed_content, "analyzed_content")?;
        check_slot(&self.suggested_keywords, &update.suggested_keywords, "suggested_keywords")?;
        check_slot(&self.selected_keywords, &update.selected_keywords, "selected_keywords")?;
        check_slot(&self.blog_markdown, &update.blog_markdown, "blog_markdown")?;
        check_slot(&self.seo_meta, &update.seo_meta, "seo_meta")?;
        check_slot(&self.image_urls, &update.image_urls, "image_urls")?;
        check_slot(&self.html_content, &update.html_content, "html_content")?;

        fill_slot(&mut self.raw_content, update.raw_content);
        fill_slot(&mut self.analyzed_content, update.analyzed_content);
        fill_slot(&mut self.suggested_keywords, update.suggested_keywords);
        fill_slot(&mut self.selected_keywords, update.selected_keywords);
        fill_slot(&mut self.blog_markdown, update.blog_markdown);
        fill_slot(&mut self.seo_meta, update.seo_meta);
        fill_slot(&mut self.image_urls, update.image_urls);
        fill_slot(&mut self.html_content, update.html_content);
        Ok(())
    }

    /// Borrow a field a previous step must have produced.
    pub fn require<'a, T>(field: &'a Option<T>, name: &'static str) -> Result<&'a T> {
        field.as_ref().ok_or_else(|| {
            BlogWriterError::validation(format!("state field '{name}' has not been produced yet"))
        })
    }
}

/// External input applied when a suspended run is resumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(default)]
    pub selected_keywords: Option<Vec<String>>,
}

impl StatePatch {
    /// A patch carrying the human's keyword choice.
    pub fn with_keywords(keywords: Vec<String>) -> Self {
        Self {
            selected_keywords: Some(keywords),
        }
    }

    /// Apply to a suspended state. An empty selection counts as "no selection",
    /// so the selection step falls back to the suggestions.
    pub fn apply_to(self, state: &mut PipelineState) -> Result<()> {
        let selected = self.selected_keywords.filter(|k| !k.is_empty());
        state.apply(StateUpdate {
            selected_keywords: selected,
            ..StateUpdate::default()
        })
    }
}

/// What a finished run hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub html_content: String,
    pub suggested_keywords: Vec<String>,
    pub selected_keywords: Vec<String>,
    pub seo_meta: SeoMeta,
    pub image_urls: Vec<String>,
}

impl TryFrom<&PipelineState> for PipelineOutput {
    type Error = BlogWriterError;

    fn try_from(state: &PipelineState) -> Result<Self> {
        Ok(Self {
            html_content: PipelineState::require(&state.html_content, "html_content")?.clone(),
            suggested_keywords: state.suggested_keywords.clone().unwrap_or_default(),
            selected_keywords: state.selected_keywords.clone().unwrap_or_default(),
            seo_meta: state.seo_meta.clone().unwrap_or_default(),
            image_urls: state.image_urls.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn apply_fills_empty_fields() {
        let mut state = PipelineState::new("https://example.com", None, RunConfig::default());
        state
            .apply(StateUpdate {
                raw_content: Some("body".into()),
                ..StateUpdate::default()
            })
            .unwrap();
        assert_eq!(state.raw_content.as_deref(), Some("body"));
        assert!(state.analyzed_content.is_none());
    }

    #[test]
    fn apply_rejects_overwrite() {
        let mut state = PipelineState::new("https://example.com", None, RunConfig::default());
        state
            .apply(StateUpdate {
                blog_markdown: Some("first".into()),
                ..StateUpdate::default()
            })
            .unwrap();

        let err = state
            .apply(StateUpdate {
                blog_markdown: Some("second".into()),
                ..StateUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, BlogWriterError::StateConflict { field: "blog_markdown" }));
        assert_eq!(state.blog_markdown.as_deref(), Some("first"));
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut state = PipelineState::new("https://example.com", None, RunConfig::default());
        state.html_content = Some("<html></html>".into());

        let result = state.apply(StateUpdate {
            blog_markdown: Some("text".into()),
            html_content: Some("different".into()),
            ..StateUpdate::default()
        });
        assert!(result.is_err());
        assert!(state.blog_markdown.is_none());
    }

    #[test]
    fn apply_accepts_identical_rewrite() {
        let mut state = PipelineState::new("https://example.com", None, RunConfig::default());
        state.selected_keywords = Some(keywords(&["a"]));
        state
            .apply(StateUpdate {
                selected_keywords: Some(keywords(&["a"])),
                ..StateUpdate::default()
            })
            .unwrap();
        assert_eq!(state.selected_keywords, Some(keywords(&["a"])));
    }

    #[test]
    fn empty_patch_selection_is_ignored() {
        let mut state = PipelineState::new("https://example.com", None, RunConfig::default());
        StatePatch::with_keywords(Vec::new()).apply_to(&mut state).unwrap();
        assert!(state.selected_keywords.is_none());

        StatePatch::with_keywords(keywords(&["rust"])).apply_to(&mut state).unwrap();
        assert_eq!(state.selected_keywords, Some(keywords(&["rust"])));
    }

    #[test]
    fn output_requires_html() {
        let state = PipelineState::new("https://example.com", None, RunConfig::default());
        assert!(PipelineOutput::try_from(&state).is_err());
    }

    #[test]
    fn state_json_roundtrip() {
        let mut state = PipelineState::new(
            "https://example.com",
            Some(keywords(&["seo"])),
            RunConfig::default(),
        );
        state.suggested_keywords = Some(keywords(&["k1", "k2"]));
        let json = serde_json::to_string(&state).unwrap();
        let parsed: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
