//! Language-model adapter.
//!
//! [`LlmRouter`] implements [`LanguageModel`] for every [`LlmProvider`] and
//! picks the HTTP dialect per call. Clients are built once at startup and
//! shared by reference.

mod anthropic;
mod google;
mod openai;

use std::time::Duration;

use async_trait::async_trait;
use blogwriter_shared::{
    AppConfig, BlogWriterError, LanguageModel, LlmProvider, ProviderConfig, Result, read_api_key,
};
use reqwest::{Client, Response};
use tracing::{debug, instrument};

/// Request timeout for model calls. Long generations take a while.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Upper bound on how much of an error body ends up in an error message.
const ERROR_BODY_LIMIT: usize = 300;

/// Resolved connection details for one provider.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub model: String,
    /// Name of the env var the key was read from, for error messages.
    pub key_env: String,
    pub api_key: Option<String>,
}

impl Endpoint {
    /// Resolve an endpoint from a provider config section, reading the key
    /// from the environment.
    pub fn from_config(section: &ProviderConfig) -> Self {
        Self {
            base_url: section.base_url.trim_end_matches('/').to_string(),
            model: section.model.clone(),
            key_env: section.api_key_env.clone(),
            api_key: read_api_key(&section.api_key_env),
        }
    }

    fn key(&self, provider: LlmProvider) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            BlogWriterError::Model(format!(
                "no API key for {provider}; set the {} environment variable",
                self.key_env
            ))
        })
    }
}

/// Multi-provider language-model client.
pub struct LlmRouter {
    client: Client,
    openai: Endpoint,
    anthropic: Endpoint,
    google: Endpoint,
}

impl LlmRouter {
    /// Build a router with explicit endpoints.
    pub fn new(openai: Endpoint, anthropic: Endpoint, google: Endpoint) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("blogwriter/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BlogWriterError::Model(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            openai,
            anthropic,
            google,
        })
    }

    /// Build a router from the app config. Missing keys only fail when that
    /// provider is actually called.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            Endpoint::from_config(&config.provider(LlmProvider::OpenAi)),
            Endpoint::from_config(&config.provider(LlmProvider::Anthropic)),
            Endpoint::from_config(&config.provider(LlmProvider::Google)),
        )
    }
}

#[async_trait]
impl LanguageModel for LlmRouter {
    #[instrument(skip_all, fields(provider = %provider, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str, provider: LlmProvider, temperature: f32) -> Result<String> {
        let text = match provider {
            LlmProvider::OpenAi => {
                let key = self.openai.key(provider)?;
                openai::complete(&self.client, &self.openai, key, prompt, temperature).await?
            }
            LlmProvider::Anthropic => {
                let key = self.anthropic.key(provider)?;
                anthropic::complete(&self.client, &self.anthropic, key, prompt, temperature).await?
            }
            LlmProvider::Google => {
                let key = self.google.key(provider)?;
                google::complete(&self.client, &self.google, key, prompt, temperature).await?
            }
        };
        debug!(response_chars = text.len(), "model call complete");
        Ok(text)
    }
}

/// Turn a non-2xx response into a `Model` error carrying status and body.
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    Err(BlogWriterError::Model(format!("{provider}: HTTP {status}: {snippet}")))
}

pub(crate) fn transport_err(provider: &str, e: reqwest::Error) -> BlogWriterError {
    BlogWriterError::Model(format!("{provider}: {e}"))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_at_call_time() {
        let mut no_key = test_support::endpoint("http://127.0.0.1:9", "claude-3-5-sonnet-20241022");
        no_key.api_key = None;
        no_key.key_env = "ANTHROPIC_API_KEY".into();

        let router = LlmRouter::new(
            test_support::endpoint("http://127.0.0.1:9", "gpt-4o"),
            no_key,
            test_support::endpoint("http://127.0.0.1:9", "gemini-1.5-pro"),
        )
        .unwrap();

        let err = router
            .complete("hi", LlmProvider::Anthropic, 0.7)
            .await
            .unwrap_err();
        assert!(matches!(err, BlogWriterError::Model(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn http_errors_become_model_errors() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(429).set_body_string("rate limit exceeded"),
            )
            .mount(&server)
            .await;

        let err = test_support::router(&server.uri())
            .complete("hi", LlmProvider::OpenAi, 0.7)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limit exceeded"));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let section = ProviderConfig {
            api_key_env: "BW_TEST_UNSET_KEY_98765".into(),
            model: "gpt-4o".into(),
            base_url: "https://api.openai.com/".into(),
        };
        let endpoint = Endpoint::from_config(&section);
        assert_eq!(endpoint.base_url, "https://api.openai.com");
        assert!(endpoint.api_key.is_none());
    }
}
