//! Image adapter: generation (DALL-E, Stability) and stock search
//! (Unsplash, Pexels) behind one [`ImageSource`] implementation.
//!
//! Every provider returns a URL string. Stability answers with inline image
//! bytes, which come back as a `data:` URL. Pexels yields an empty string
//! when nothing matches.

mod providers;

use std::time::Duration;

use async_trait::async_trait;
use blogwriter_shared::{
    AppConfig, BlogWriterError, ImageProvider, ImageSource, LlmProvider, Result, read_api_key,
};
use reqwest::{Client, Response};
use tracing::{debug, instrument};

const REQUEST_TIMEOUT_SECS: u64 = 90;

/// Base URL plus the key read from the environment.
#[derive(Debug, Clone)]
pub struct ImageEndpoint {
    pub base_url: String,
    pub key_env: String,
    pub api_key: Option<String>,
}

impl ImageEndpoint {
    pub fn new(base_url: &str, key_env: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key_env: key_env.to_string(),
            api_key: read_api_key(key_env),
        }
    }

    fn key(&self, provider: ImageProvider) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            BlogWriterError::Image(format!(
                "no API key for {provider}; set the {} environment variable",
                self.key_env
            ))
        })
    }
}

/// DALL-E request parameters.
#[derive(Debug, Clone)]
pub struct DalleSettings {
    pub endpoint: ImageEndpoint,
    pub model: String,
    pub size: String,
}

/// Multi-provider image client.
pub struct ImageRouter {
    client: Client,
    dalle: DalleSettings,
    stability: ImageEndpoint,
    unsplash: ImageEndpoint,
    pexels: ImageEndpoint,
}

impl ImageRouter {
    pub fn new(
        dalle: DalleSettings,
        stability: ImageEndpoint,
        unsplash: ImageEndpoint,
        pexels: ImageEndpoint,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("blogwriter/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BlogWriterError::Image(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            dalle,
            stability,
            unsplash,
            pexels,
        })
    }

    /// Build from the app config. DALL-E shares the `[openai]` key and base URL.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let openai = config.provider(LlmProvider::OpenAi);
        let images = &config.images;
        Self::new(
            DalleSettings {
                endpoint: ImageEndpoint::new(&openai.base_url, &openai.api_key_env),
                model: images.dalle_model.clone(),
                size: images.dalle_size.clone(),
            },
            ImageEndpoint::new(&images.stability_base_url, &images.stability_api_key_env),
            ImageEndpoint::new(&images.unsplash_base_url, &images.unsplash_access_key_env),
            ImageEndpoint::new(&images.pexels_base_url, &images.pexels_api_key_env),
        )
    }
}

#[async_trait]
impl ImageSource for ImageRouter {
    #[instrument(skip_all, fields(provider = %provider))]
    async fn generate_or_fetch(&self, query: &str, provider: ImageProvider) -> Result<String> {
        let url = match provider {
            ImageProvider::Dalle => {
                let key = self.dalle.endpoint.key(provider)?;
                providers::dalle(&self.client, &self.dalle, key, query).await?
            }
            ImageProvider::Stability => {
                let key = self.stability.key(provider)?;
                providers::stability(&self.client, &self.stability, key, query).await?
            }
            ImageProvider::Unsplash => {
                let key = self.unsplash.key(provider)?;
                providers::unsplash(&self.client, &self.unsplash, key, query).await?
            }
            ImageProvider::Pexels => {
                let key = self.pexels.key(provider)?;
                providers::pexels(&self.client, &self.pexels, key, query).await?
            }
        };
        debug!(found = !url.is_empty(), "image lookup complete");
        Ok(url)
    }
}

pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(300).collect();
    Err(BlogWriterError::Image(format!("{provider}: HTTP {status}: {snippet}")))
}

pub(crate) fn transport_err(provider: &str, e: reqwest::Error) -> BlogWriterError {
    BlogWriterError::Image(format!("{provider}: {e}"))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn endpoint(base: &str) -> ImageEndpoint {
        ImageEndpoint {
            base_url: base.to_string(),
            key_env: "TEST_KEY".into(),
            api_key: Some("test-key".into()),
        }
    }

    fn router(base: &str) -> ImageRouter {
        ImageRouter::new(
            DalleSettings {
                endpoint: endpoint(base),
                model: "dall-e-3".into(),
                size: "1024x1024".into(),
            },
            endpoint(base),
            endpoint(base),
            endpoint(base),
        )
        .expect("build router")
    }

    #[tokio::test]
    async fn dalle_returns_generated_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "dall-e-3",
                "prompt": "a crab reading a book",
                "size": "1024x1024",
                "n": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": "https://images.example.com/crab.png"}]
            })))
            .mount(&server)
            .await;

        let url = router(&server.uri())
            .generate_or_fetch("a crab reading a book", ImageProvider::Dalle)
            .await
            .expect("dalle");
        assert_eq!(url, "https://images.example.com/crab.png");
    }

    #[tokio::test]
    async fn stability_returns_data_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generation/stable-diffusion-v1-6/text-to-image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artifacts": [{"base64": "iVBORw0KGgo=", "finishReason": "SUCCESS"}]
            })))
            .mount(&server)
            .await;

        let url = router(&server.uri())
            .generate_or_fetch("sunset", ImageProvider::Stability)
            .await
            .expect("stability");
        assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn unsplash_uses_client_id_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/random"))
            .and(query_param("query", "mountains"))
            .and(query_param("orientation", "landscape"))
            .and(header("authorization", "Client-ID test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "urls": {"regular": "https://images.unsplash.com/photo-1"}
            })))
            .mount(&server)
            .await;

        let url = router(&server.uri())
            .generate_or_fetch("mountains", ImageProvider::Unsplash)
            .await
            .expect("unsplash");
        assert_eq!(url, "https://images.unsplash.com/photo-1");
    }

    #[tokio::test]
    async fn pexels_without_results_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("per_page", "1"))
            .and(header("authorization", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"photos": []})),
            )
            .mount(&server)
            .await;

        let url = router(&server.uri())
            .generate_or_fetch("nothing matches", ImageProvider::Pexels)
            .await
            .expect("pexels");
        assert_eq!(url, "");
    }

    #[tokio::test]
    async fn pexels_returns_large_src() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "photos": [{"src": {"large": "https://images.pexels.com/1.jpeg"}}]
            })))
            .mount(&server)
            .await;

        let url = router(&server.uri())
            .generate_or_fetch("city", ImageProvider::Pexels)
            .await
            .unwrap();
        assert_eq!(url, "https://images.pexels.com/1.jpeg");
    }

    #[tokio::test]
    async fn missing_key_is_image_error() {
        let mut r = router("http://127.0.0.1:9");
        r.unsplash.api_key = None;
        let err = r
            .generate_or_fetch("x", ImageProvider::Unsplash)
            .await
            .unwrap_err();
        assert!(matches!(err, BlogWriterError::Image(_)));
    }
}
