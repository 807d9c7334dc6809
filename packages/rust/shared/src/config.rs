//! Application configuration for Blog Writer.
//!
//! User config lives at `~/.blogwriter/blogwriter.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored; each provider section names the env var to read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlogWriterError, Result};
use crate::types::{DEFAULT_TEMPERATURE, ImageProvider, LlmProvider, RunConfig, ScraperKind};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blogwriter.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blogwriter";

/// Default run database file name, inside the config directory.
const DB_FILE_NAME: &str = "runs.db";

// ---------------------------------------------------------------------------
// Config structs (matching blogwriter.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-run defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default = "openai_defaults")]
    pub openai: ProviderConfig,

    #[serde(default = "anthropic_defaults")]
    pub anthropic: ProviderConfig,

    #[serde(default = "google_defaults")]
    pub google: ProviderConfig,

    /// Image providers.
    #[serde(default)]
    pub images: ImagesConfig,

    /// Source fetching.
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            openai: openai_defaults(),
            anthropic: anthropic_defaults(),
            google: google_defaults(),
            images: ImagesConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub llm_provider: LlmProvider,

    #[serde(default)]
    pub image_provider: ImageProvider,

    #[serde(default)]
    pub scraper: ScraperKind,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Run database path. Unset means `~/.blogwriter/runs.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::default(),
            image_provider: ImageProvider::default(),
            scraper: ScraperKind::default(),
            temperature: DEFAULT_TEMPERATURE,
            db_path: None,
        }
    }
}

impl DefaultsConfig {
    /// The run configuration these defaults describe.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            llm_provider: self.llm_provider,
            image_provider: self.image_provider,
            scraper: self.scraper,
            temperature: self.temperature,
        }
    }
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

/// `[openai]`, `[anthropic]` and `[google]` sections.
///
/// Fields left out of the file are filled from the provider's built-in
/// values by [`AppConfig::provider`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default)]
    pub api_key_env: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub base_url: String,
}

fn openai_defaults() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "OPENAI_API_KEY".into(),
        model: "gpt-4o".into(),
        base_url: "https://api.openai.com".into(),
    }
}

fn anthropic_defaults() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "ANTHROPIC_API_KEY".into(),
        model: "claude-3-5-sonnet-20241022".into(),
        base_url: "https://api.anthropic.com".into(),
    }
}

fn google_defaults() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "GOOGLE_API_KEY".into(),
        model: "gemini-1.5-pro".into(),
        base_url: "https://generativelanguage.googleapis.com".into(),
    }
}

impl ProviderConfig {
    fn filled_from(&self, builtin: ProviderConfig) -> ProviderConfig {
        fn pick(value: &str, fallback: String) -> String {
            if value.trim().is_empty() { fallback } else { value.to_string() }
        }
        ProviderConfig {
            api_key_env: pick(&self.api_key_env, builtin.api_key_env),
            model: pick(&self.model, builtin.model),
            base_url: pick(&self.base_url, builtin.base_url),
        }
    }
}

/// `[images]` section. DALL-E reuses the `[openai]` key and base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_dalle_model")]
    pub dalle_model: String,

    #[serde(default = "default_dalle_size")]
    pub dalle_size: String,

    #[serde(default = "default_stability_key_env")]
    pub stability_api_key_env: String,

    #[serde(default = "default_stability_base_url")]
    pub stability_base_url: String,

    #[serde(default = "default_unsplash_key_env")]
    pub unsplash_access_key_env: String,

    #[serde(default = "default_unsplash_base_url")]
    pub unsplash_base_url: String,

    #[serde(default = "default_pexels_key_env")]
    pub pexels_api_key_env: String,

    #[serde(default = "default_pexels_base_url")]
    pub pexels_base_url: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dalle_model: default_dalle_model(),
            dalle_size: default_dalle_size(),
            stability_api_key_env: default_stability_key_env(),
            stability_base_url: default_stability_base_url(),
            unsplash_access_key_env: default_unsplash_key_env(),
            unsplash_base_url: default_unsplash_base_url(),
            pexels_api_key_env: default_pexels_key_env(),
            pexels_base_url: default_pexels_base_url(),
        }
    }
}

fn default_dalle_model() -> String {
    "dall-e-3".into()
}
fn default_dalle_size() -> String {
    "1024x1024".into()
}
fn default_stability_key_env() -> String {
    "STABILITY_API_KEY".into()
}
fn default_stability_base_url() -> String {
    "https://api.stability.ai".into()
}
fn default_unsplash_key_env() -> String {
    "UNSPLASH_ACCESS_KEY".into()
}
fn default_unsplash_base_url() -> String {
    "https://api.unsplash.com".into()
}
fn default_pexels_key_env() -> String {
    "PEXELS_API_KEY".into()
}
fn default_pexels_base_url() -> String {
    "https://api.pexels.com".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request (or browser render) timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Headless browser executable used by the rendered scraper.
    #[serde(default = "default_browser_cmd")]
    pub browser_cmd: String,

    /// Permit loopback / private-network targets.
    #[serde(default)]
    pub allow_private_hosts: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            browser_cmd: default_browser_cmd(),
            allow_private_hosts: false,
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_browser_cmd() -> String {
    "chromium".into()
}
fn default_user_agent() -> String {
    format!("blogwriter/{}", env!("CARGO_PKG_VERSION"))
}

impl AppConfig {
    /// Settings for one model provider, with unset fields filled in.
    pub fn provider(&self, provider: LlmProvider) -> ProviderConfig {
        match provider {
            LlmProvider::OpenAi => self.openai.filled_from(openai_defaults()),
            LlmProvider::Anthropic => self.anthropic.filled_from(anthropic_defaults()),
            LlmProvider::Google => self.google.filled_from(google_defaults()),
        }
    }

    /// The config as runs see it: every provider section filled in.
    pub fn resolved(&self) -> AppConfig {
        AppConfig {
            openai: self.provider(LlmProvider::OpenAi),
            anthropic: self.provider(LlmProvider::Anthropic),
            google: self.provider(LlmProvider::Google),
            ..self.clone()
        }
    }

    /// Resolved run database path.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.defaults.db_path {
            Some(p) => Ok(expand_home(p)),
            None => Ok(config_dir()?.join(DB_FILE_NAME)),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blogwriter/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlogWriterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blogwriter/blogwriter.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlogWriterError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BlogWriterError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlogWriterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| BlogWriterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlogWriterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty secret from the named env var.
pub fn read_api_key(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// Check that the selected model provider's API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig, provider: LlmProvider) -> Result<()> {
    let var_name = config.provider(provider).api_key_env;
    match read_api_key(&var_name) {
        Some(_) => Ok(()),
        None => Err(BlogWriterError::config(format!(
            "{provider} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("llm_provider = \"openai\""));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("dall-e-3"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.llm_provider, LlmProvider::OpenAi);
        assert_eq!(parsed.anthropic.model, "claude-3-5-sonnet-20241022");
        assert_eq!(parsed.fetch.timeout_secs, 30);
    }

    #[test]
    fn partial_provider_section_keeps_builtins() {
        let toml_str = r#"
[defaults]
llm_provider = "google"
image_provider = "unsplash"

[google]
model = "gemini-1.5-flash"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        let google = config.provider(LlmProvider::Google);
        assert_eq!(google.model, "gemini-1.5-flash");
        assert_eq!(google.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(google.base_url, "https://generativelanguage.googleapis.com");

        let run = config.defaults.run_config();
        assert_eq!(run.llm_provider, LlmProvider::Google);
        assert_eq!(run.image_provider, ImageProvider::Unsplash);
        assert_eq!(run.scraper, ScraperKind::Static);
    }

    #[test]
    fn resolved_config_fills_provider_sections() {
        let toml_str = r#"
[openai]
model = "gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.openai.api_key_env.is_empty());

        let resolved = config.resolved();
        assert_eq!(resolved.openai.model, "gpt-4o-mini");
        assert_eq!(resolved.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(resolved.openai.base_url, "https://api.openai.com");
        assert_eq!(resolved.anthropic.model, "claude-3-5-sonnet-20241022");

        let shown = toml::to_string_pretty(&resolved).expect("serialize");
        assert!(shown.contains("api_key_env = \"OPENAI_API_KEY\""));
    }

    #[test]
    fn unknown_provider_fails_at_parse_time() {
        let toml_str = r#"
[defaults]
llm_provider = "mistral"
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn db_path_override() {
        let mut config = AppConfig::default();
        config.defaults.db_path = Some("/tmp/blogwriter-runs.db".into());
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/blogwriter-runs.db"));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "BW_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config, LlmProvider::Anthropic);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("API key not found"));
        assert!(msg.contains("BW_TEST_NONEXISTENT_KEY_12345"));
    }
}
