//! Content fetching for the blog pipeline.
//!
//! [`WebFetcher`] implements [`ContentFetcher`] for both scraper kinds:
//! - [`ScraperKind::Static`]: a plain GET with `reqwest`
//! - [`ScraperKind::Rendered`]: a headless browser dump of the live DOM
//!
//! Either way the HTML goes through [`extract_text`] before it is returned.

pub mod guard;
pub mod render;
pub mod text;

use std::time::Duration;

use async_trait::async_trait;
use blogwriter_shared::{BlogWriterError, ContentFetcher, FetchConfig, Result, ScraperKind};
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};
use url::Url;

pub use guard::{MAX_REDIRECTS, check_redirect, is_private_target, parse_source_url};
pub use text::extract_text;

/// Fetches source pages over HTTP or through a headless browser.
pub struct WebFetcher {
    client: Client,
    browser_cmd: String,
    timeout: Duration,
    allow_private_hosts: bool,
}

impl WebFetcher {
    /// Build a fetcher from the `[fetch]` config section.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            client: build_client(config, !config.allow_private_hosts)?,
            browser_cmd: config.browser_cmd.clone(),
            timeout,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    fn check_target(&self, raw: &str) -> Result<Url> {
        let url = parse_source_url(raw)?;
        if !self.allow_private_hosts && is_private_target(&url) {
            warn!(%url, "refusing private network target");
            return Err(BlogWriterError::Fetch(format!(
                "{url}: private or loopback hosts are not allowed"
            )));
        }
        Ok(url)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| BlogWriterError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlogWriterError::Fetch(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| BlogWriterError::Fetch(format!("{url}: body read failed: {e}")))
    }
}

/// HTTP client with the redirect limit. With `guard_redirects` every hop is
/// also checked against the private-target rules.
fn build_client(config: &FetchConfig, guard_redirects: bool) -> Result<Client> {
    let policy = if guard_redirects {
        Policy::custom(|attempt| {
            match check_redirect(attempt.url(), attempt.previous().len()) {
                Ok(()) => attempt.follow(),
                Err(reason) => {
                    warn!(url = %attempt.url(), %reason, "redirect refused");
                    attempt.error(reason)
                }
            }
        })
    } else {
        Policy::limited(MAX_REDIRECTS)
    };

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(policy)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| BlogWriterError::Fetch(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl ContentFetcher for WebFetcher {
    #[instrument(skip_all, fields(url = %url, mode = %mode))]
    async fn fetch(&self, url: &str, mode: ScraperKind) -> Result<String> {
        let target = self.check_target(url)?;

        let html = match mode {
            ScraperKind::Static => self.fetch_html(&target).await?,
            ScraperKind::Rendered => {
                render::render_dom(&self.browser_cmd, target.as_str(), self.timeout).await?
            }
        };

        let text = extract_text(&html);
        debug!(html_bytes = html.len(), text_chars = text.chars().count(), "extracted text");
        Ok(text)
    }
}
