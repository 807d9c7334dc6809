//! The eight blog pipeline steps.
//!
//! Fallback policies:
//! - analysis, keyword suggestion and SEO recover from unparseable model
//!   output with deterministic substitutes
//! - image generation absorbs every failure and yields no images
//! - fetch, writing and HTML conversion have no fallback

use async_trait::async_trait;
use tracing::{info, warn};

use blogwriter_shared::{PipelineState, Result, StateUpdate, StepName};

use crate::extract::{
    SEO_INPUT_CHARS, fallback_analysis, fallback_seo, parse_analysis, parse_keywords,
    parse_seo, prefix_chars, quoted_keywords, truncate_raw_content,
};
use crate::pipeline::{Collaborators, Step};
use crate::prompts;

pub struct FetchContent;

#[async_trait]
impl Step for FetchContent {
    fn name(&self) -> StepName {
        StepName::FetchContent
    }

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate> {
        let scraper = state.run_config.scraper;
        info!(url = %state.url, %scraper, "fetching content");

        let content = deps.fetcher.fetch(&state.url, scraper).await?;
        let raw_content = truncate_raw_content(content);

        Ok(StateUpdate {
            raw_content: Some(raw_content),
            ..StateUpdate::default()
        })
    }
}

pub struct AnalyzeContent;

#[async_trait]
impl Step for AnalyzeContent {
    fn name(&self) -> StepName {
        StepName::AnalyzeContent
    }

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate> {
        let raw_content = PipelineState::require(&state.raw_content, "raw_content")?;
        let config = &state.run_config;

        let response = deps
            .model
            .complete(&prompts::analyze_content(raw_content), config.llm_provider, config.temperature)
            .await?;

        let analysis = parse_analysis(&response).unwrap_or_else(|e| {
            warn!(error = %e, "analysis unparseable, using fallback");
            fallback_analysis(raw_content)
        });

        Ok(StateUpdate {
            analyzed_content: Some(analysis),
            ..StateUpdate::default()
        })
    }
}

pub struct SuggestKeywords;

#[async_trait]
impl Step for SuggestKeywords {
    fn name(&self) -> StepName {
        StepName::SuggestKeywords
    }

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate> {
        let analysis = PipelineState::require(&state.analyzed_content, "analyzed_content")?;
        let config = &state.run_config;

        let prompt = prompts::suggest_keywords(analysis, state.user_keywords.as_deref());
        let response = deps
            .model
            .complete(&prompt, config.llm_provider, config.temperature)
            .await?;

        let keywords = parse_keywords(&response).unwrap_or_else(|e| {
            warn!(error = %e, "keywords unparseable, extracting quoted strings");
            quoted_keywords(&response)
        });
        info!(?keywords, "suggested keywords");

        Ok(StateUpdate {
            suggested_keywords: Some(keywords),
            ..StateUpdate::default()
        })
    }
}

/// Resolves the final keyword set. The controller pauses in front of this
/// step; the step itself never blocks.
pub struct HumanSelectKeywords;

#[async_trait]
impl Step for HumanSelectKeywords {
    fn name(&self) -> StepName {
        StepName::HumanSelectKeywords
    }

    async fn run(&self, state: &PipelineState, _deps: &Collaborators) -> Result<StateUpdate> {
        let selected = match &state.selected_keywords {
            Some(chosen) if !chosen.is_empty() => chosen.clone(),
            _ => PipelineState::require(&state.suggested_keywords, "suggested_keywords")?.clone(),
        };
        info!(?selected, "selected keywords");

        Ok(StateUpdate {
            selected_keywords: Some(selected),
            ..StateUpdate::default()
        })
    }
}

pub struct WriteBlog;

#[async_trait]
impl Step for WriteBlog {
    fn name(&self) -> StepName {
        StepName::WriteBlog
    }

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate> {
        let analysis = PipelineState::require(&state.analyzed_content, "analyzed_content")?;
        let keywords = PipelineState::require(&state.selected_keywords, "selected_keywords")?;
        let config = &state.run_config;

        let markdown = deps
            .model
            .complete(&prompts::write_blog(analysis, keywords), config.llm_provider, config.temperature)
            .await?;

        Ok(StateUpdate {
            blog_markdown: Some(markdown),
            ..StateUpdate::default()
        })
    }
}

pub struct OptimizeSeo;

#[async_trait]
impl Step for OptimizeSeo {
    fn name(&self) -> StepName {
        StepName::OptimizeSeo
    }

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate> {
        let markdown = PipelineState::require(&state.blog_markdown, "blog_markdown")?;
        let keywords = PipelineState::require(&state.selected_keywords, "selected_keywords")?;
        let config = &state.run_config;

        let prompt = prompts::optimize_seo(prefix_chars(markdown, SEO_INPUT_CHARS), keywords);
        let response = deps
            .model
            .complete(&prompt, config.llm_provider, config.temperature)
            .await?;

        let seo = parse_seo(&response).unwrap_or_else(|e| {
            warn!(error = %e, "SEO metadata unparseable, using fallback");
            fallback_seo(markdown)
        });

        Ok(StateUpdate {
            seo_meta: Some(seo),
            ..StateUpdate::default()
        })
    }
}

pub struct GenerateImages;

impl GenerateImages {
    async fn find_image(&self, state: &PipelineState, deps: &Collaborators) -> Result<Vec<String>> {
        let analysis = PipelineState::require(&state.analyzed_content, "analyzed_content")?;
        let config = &state.run_config;

        let prompt = deps
            .model
            .complete(&prompts::image_prompt(analysis), config.llm_provider, config.temperature)
            .await?;

        let url = deps
            .images
            .generate_or_fetch(prompt.trim(), config.image_provider)
            .await?;

        Ok(if url.is_empty() { Vec::new() } else { vec![url] })
    }
}

#[async_trait]
impl Step for GenerateImages {
    fn name(&self) -> StepName {
        StepName::GenerateImages
    }

    async fn run(&self, state: &PipelineState, deps: &Collaborators) -> Result<StateUpdate> {
        let image_urls = match self.find_image(state, deps).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(error = %e, provider = %state.run_config.image_provider, "image generation failed, continuing without images");
                Vec::new()
            }
        };
        info!(count = image_urls.len(), "images ready");

        Ok(StateUpdate {
            image_urls: Some(image_urls),
            ..StateUpdate::default()
        })
    }
}

pub struct ConvertToHtml;

#[async_trait]
impl Step for ConvertToHtml {
    fn name(&self) -> StepName {
        StepName::ConvertToHtml
    }

    async fn run(&self, state: &PipelineState, _deps: &Collaborators) -> Result<StateUpdate> {
        let markdown = PipelineState::require(&state.blog_markdown, "blog_markdown")?;
        let image_urls = state.image_urls.as_deref().unwrap_or_default();
        let seo = state.seo_meta.clone().unwrap_or_default();

        let html = blogwriter_markdown::render_document(markdown, image_urls, &seo);

        Ok(StateUpdate {
            html_content: Some(html),
            ..StateUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, collaborators, state_with};
    use blogwriter_shared::{AnalyzedContent, BlogWriterError, SeoMeta};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn analysed() -> PipelineState {
        state_with(|s| {
            s.raw_content = Some("Sample content from website".into());
            s.analyzed_content = Some(AnalyzedContent {
                title: "T".into(),
                main_topic: "Topic".into(),
                key_points: strings(&["p1", "p2"]),
                summary: "S".into(),
                tone: "casual".into(),
            });
        })
    }

    #[tokio::test]
    async fn fetch_truncates_long_content() {
        let deps = collaborators(Script::new([]), "x".repeat(12_000), Ok(String::new()));
        let update = FetchContent.run(&state_with(|_| {}), &deps.handle).await.unwrap();
        let raw = update.raw_content.unwrap();
        assert_eq!(raw.chars().count(), 10_000 + "\n...[truncated]".len());
    }

    #[tokio::test]
    async fn fetch_passes_short_content_through() {
        let deps = collaborators(Script::new([]), "short".into(), Ok(String::new()));
        let update = FetchContent.run(&state_with(|_| {}), &deps.handle).await.unwrap();
        assert_eq!(update.raw_content.as_deref(), Some("short"));
    }

    #[tokio::test]
    async fn malformed_analysis_falls_back() {
        let deps = collaborators(
            Script::new([Ok("I'm sorry, I can't do JSON today".into())]),
            String::new(),
            Ok(String::new()),
        );
        let state = state_with(|s| s.raw_content = Some("Sample content from website".into()));
        let update = AnalyzeContent.run(&state, &deps.handle).await.unwrap();
        let analysis = update.analyzed_content.unwrap();
        assert_eq!(analysis.tone, "neutral");
        assert_eq!(analysis.title, "Untitled");
        assert_eq!(analysis.summary, "Sample content from website");
    }

    #[tokio::test]
    async fn analysis_model_error_propagates() {
        let deps = collaborators(
            Script::new([Err(BlogWriterError::Model("quota exceeded".into()))]),
            String::new(),
            Ok(String::new()),
        );
        let state = state_with(|s| s.raw_content = Some("c".into()));
        let err = AnalyzeContent.run(&state, &deps.handle).await.unwrap_err();
        assert!(matches!(err, BlogWriterError::Model(_)));
    }

    #[tokio::test]
    async fn keywords_never_exceed_three() {
        let deps = collaborators(
            Script::new([Ok(r#"{"keywords": ["a", "b", "c", "d"]}"#.into())]),
            String::new(),
            Ok(String::new()),
        );
        let update = SuggestKeywords.run(&analysed(), &deps.handle).await.unwrap();
        assert_eq!(update.suggested_keywords.unwrap(), strings(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn keyword_fallback_uses_quoted_strings() {
        let deps = collaborators(
            Script::new([Ok(r#"Keywords: "alpha", "beta""#.into())]),
            String::new(),
            Ok(String::new()),
        );
        let update = SuggestKeywords.run(&analysed(), &deps.handle).await.unwrap();
        assert_eq!(update.suggested_keywords.unwrap(), strings(&["alpha", "beta"]));
    }

    #[tokio::test]
    async fn keyword_prompt_includes_user_keywords() {
        let script = Script::new([Ok(r#"{"keywords": []}"#.into())]);
        let deps = collaborators(script.clone(), String::new(), Ok(String::new()));
        let mut state = analysed();
        state.user_keywords = Some(strings(&["ownership"]));
        SuggestKeywords.run(&state, &deps.handle).await.unwrap();
        assert!(script.prompts()[0].contains("ownership"));
    }

    #[tokio::test]
    async fn selection_defaults_to_suggestions() {
        let deps = collaborators(Script::new([]), String::new(), Ok(String::new()));
        let state = state_with(|s| s.suggested_keywords = Some(strings(&["a", "b", "c"])));
        let update = HumanSelectKeywords.run(&state, &deps.handle).await.unwrap();
        assert_eq!(update.selected_keywords.unwrap(), strings(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn selection_keeps_prior_choice() {
        let deps = collaborators(Script::new([]), String::new(), Ok(String::new()));
        let state = state_with(|s| {
            s.suggested_keywords = Some(strings(&["a", "b", "c"]));
            s.selected_keywords = Some(strings(&["a"]));
        });
        let update = HumanSelectKeywords.run(&state, &deps.handle).await.unwrap();
        assert_eq!(update.selected_keywords.unwrap(), strings(&["a"]));
    }

    #[tokio::test]
    async fn seo_fallback_on_garbage() {
        let deps = collaborators(Script::new([Ok("no json".into())]), String::new(), Ok(String::new()));
        let state = state_with(|s| {
            s.blog_markdown = Some("# Post\n\nBody".into());
            s.selected_keywords = Some(strings(&["k"]));
        });
        let update = OptimizeSeo.run(&state, &deps.handle).await.unwrap();
        assert_eq!(
            update.seo_meta.unwrap(),
            SeoMeta {
                title: "Blog Post".into(),
                description: "# Post\n\nBody".into()
            }
        );
    }

    #[tokio::test]
    async fn seo_prompt_sees_limited_excerpt() {
        let script = Script::new([Ok(r#"{"title": "t", "description": "d"}"#.into())]);
        let deps = collaborators(script.clone(), String::new(), Ok(String::new()));
        let state = state_with(|s| {
            s.blog_markdown = Some(format!("{}{}", "a".repeat(3_000), "TAIL_MARKER"));
            s.selected_keywords = Some(strings(&["k"]));
        });
        OptimizeSeo.run(&state, &deps.handle).await.unwrap();
        assert!(!script.prompts()[0].contains("TAIL_MARKER"));
    }

    #[tokio::test]
    async fn image_failure_yields_empty_list() {
        let deps = collaborators(
            Script::new([Ok("a lighthouse at dawn".into())]),
            String::new(),
            Err(BlogWriterError::Image("quota".into())),
        );
        let update = GenerateImages.run(&analysed(), &deps.handle).await.unwrap();
        assert_eq!(update.image_urls, Some(Vec::new()));
    }

    #[tokio::test]
    async fn image_prompt_model_error_is_absorbed() {
        let deps = collaborators(
            Script::new([Err(BlogWriterError::Model("down".into()))]),
            String::new(),
            Ok("https://img/1.png".into()),
        );
        let update = GenerateImages.run(&analysed(), &deps.handle).await.unwrap();
        assert_eq!(update.image_urls, Some(Vec::new()));
    }

    #[tokio::test]
    async fn empty_image_url_yields_empty_list() {
        let deps = collaborators(Script::new([Ok("prompt".into())]), String::new(), Ok(String::new()));
        let update = GenerateImages.run(&analysed(), &deps.handle).await.unwrap();
        assert_eq!(update.image_urls, Some(Vec::new()));
    }

    #[tokio::test]
    async fn image_query_is_trimmed_model_output() {
        let deps = collaborators(
            Script::new([Ok("  a lighthouse at dawn \n".into())]),
            String::new(),
            Ok("https://img/1.png".into()),
        );
        let update = GenerateImages.run(&analysed(), &deps.handle).await.unwrap();
        assert_eq!(update.image_urls, Some(strings(&["https://img/1.png"])));
        assert_eq!(deps.images.queries(), strings(&["a lighthouse at dawn"]));
    }

    #[tokio::test]
    async fn html_conversion_substitutes_images() {
        let deps = collaborators(Script::new([]), String::new(), Ok(String::new()));
        let state = state_with(|s| {
            s.blog_markdown = Some("# Title\n\n[IMAGE: hero]".into());
            s.image_urls = Some(strings(&["https://img/hero.png"]));
        });
        let update = ConvertToHtml.run(&state, &deps.handle).await.unwrap();
        let html = update.html_content.unwrap();
        assert!(html.contains(r#"src="https://img/hero.png""#));
        assert!(html.contains("<title>Blog Post</title>"));
    }
}
