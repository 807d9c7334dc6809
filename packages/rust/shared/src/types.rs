//! Core domain types for Blog Writer runs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BlogWriterError;
use crate::state::PipelineState;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// Opaque run identifier. Either chosen by the caller (a thread id) or a
/// generated, time-sortable UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Creates a run id from a caller-supplied value, returning `None` if it is blank.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.trim().is_empty() { None } else { Some(Self(v)) }
    }

    /// Generate a new time-sortable run id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = BlogWriterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| BlogWriterError::validation("run id must not be empty"))
    }
}

// ---------------------------------------------------------------------------
// Provider selectors
// ---------------------------------------------------------------------------

/// Generates `as_str`, `Display`, `FromStr` and serde impls for a closed
/// selector enum. Every input path (CLI, TOML, JSON) goes through `FromStr`,
/// so names are case-insensitive everywhere and unknown names are rejected
/// with a config error.
macro_rules! selector {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All supported values, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The configuration name of this selector.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = BlogWriterError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => {
                        let known: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        Err(BlogWriterError::config(format!(
                            "unsupported {} '{other}' (expected one of: {})",
                            $kind,
                            known.join(", ")
                        )))
                    }
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Language-model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Anthropic,
    Google,
}

selector!(LlmProvider, "LLM provider", {
    OpenAi => "openai",
    Anthropic => "anthropic",
    Google => "google",
});

/// Image generation / stock photo provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageProvider {
    #[default]
    Dalle,
    Stability,
    Unsplash,
    Pexels,
}

selector!(ImageProvider, "image provider", {
    Dalle => "dalle",
    Stability => "stability",
    Unsplash => "unsplash",
    Pexels => "pexels",
});

/// How source content is fetched: plain HTTP or a headless browser render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScraperKind {
    #[default]
    Static,
    Rendered,
}

selector!(ScraperKind, "scraper", {
    Static => "static",
    Rendered => "rendered",
});

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Default sampling temperature for every model call.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-run provider selection, carried in the pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub llm_provider: LlmProvider,
    #[serde(default)]
    pub image_provider: ImageProvider,
    #[serde(default)]
    pub scraper: ScraperKind,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::default(),
            image_provider: ImageProvider::default(),
            scraper: ScraperKind::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

// ---------------------------------------------------------------------------
// Step outputs
// ---------------------------------------------------------------------------

/// Structured analysis of the fetched source content.
///
/// Deserialises leniently: any missing field takes its default, so a partial
/// object from the model still counts as a successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzedContent {
    pub title: String,
    pub main_topic: String,
    pub key_points: Vec<String>,
    pub summary: String,
    pub tone: String,
}

impl Default for AnalyzedContent {
    fn default() -> Self {
        Self {
            title: String::new(),
            main_topic: String::new(),
            key_points: Vec::new(),
            summary: String::new(),
            tone: "neutral".into(),
        }
    }
}

/// SEO metadata injected into the rendered document head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoMeta {
    pub title: String,
    pub description: String,
}

impl Default for SeoMeta {
    fn default() -> Self {
        Self {
            title: "Blog Post".into(),
            description: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// StepName
// ---------------------------------------------------------------------------

/// The eight steps of the blog pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    FetchContent,
    AnalyzeContent,
    SuggestKeywords,
    HumanSelectKeywords,
    WriteBlog,
    OptimizeSeo,
    GenerateImages,
    ConvertToHtml,
}

impl StepName {
    /// Stable snake_case name used in logs and persisted status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchContent => "fetch_content",
            Self::AnalyzeContent => "analyze_content",
            Self::SuggestKeywords => "suggest_keywords",
            Self::HumanSelectKeywords => "human_select_keywords",
            Self::WriteBlog => "write_blog",
            Self::OptimizeSeo => "optimize_seo",
            Self::GenerateImages => "generate_images",
            Self::ConvertToHtml => "convert_to_html",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a run.
///
/// `NotStarted → Running → (SuspendedAt → Running)* → Completed | Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Running { step: StepName },
    SuspendedAt { step: StepName },
    Completed,
    Failed { step: StepName, error: String },
}

impl RunStatus {
    /// Short label, also used as the indexed status column in storage.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running { .. } => "running",
            Self::SuspendedAt { .. } => "suspended",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running { step } => write!(f, "running ({step})"),
            Self::SuspendedAt { step } => write!(f, "suspended before {step}"),
            Self::Failed { step, error } => write!(f, "failed at {step}: {error}"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// Everything persisted for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub status: RunStatus,
    pub state: PipelineState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    /// A fresh record for a run that has not executed any step yet.
    pub fn new(run_id: RunId, state: PipelineState) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            status: RunStatus::NotStarted,
            state,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`, bumping `updated_at`.
    pub fn transition(&mut self, status: RunStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
