//! Per-provider HTTP calls.

use blogwriter_shared::{BlogWriterError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{DalleSettings, ImageEndpoint, check_status, transport_err};

// ---------------------------------------------------------------------------
// DALL-E
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DalleResponse {
    #[serde(default)]
    data: Vec<DalleImage>,
}

#[derive(Debug, Deserialize)]
struct DalleImage {
    #[serde(default)]
    url: String,
}

pub(crate) async fn dalle(
    client: &Client,
    settings: &DalleSettings,
    api_key: &str,
    prompt: &str,
) -> Result<String> {
    let response = client
        .post(format!("{}/v1/images/generations", settings.endpoint.base_url))
        .bearer_auth(api_key)
        .json(&json!({
            "model": settings.model,
            "prompt": prompt,
            "size": settings.size,
            "quality": "standard",
            "n": 1,
        }))
        .send()
        .await
        .map_err(|e| transport_err("dalle", e))?;

    let body: DalleResponse = check_status("dalle", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("dalle", e))?;

    body.data
        .into_iter()
        .next()
        .map(|img| img.url)
        .ok_or_else(|| BlogWriterError::Image("dalle: response contained no image".into()))
}

// ---------------------------------------------------------------------------
// Stability
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StabilityResponse {
    #[serde(default)]
    artifacts: Vec<StabilityArtifact>,
}

#[derive(Debug, Deserialize)]
struct StabilityArtifact {
    base64: String,
}

pub(crate) async fn stability(
    client: &Client,
    endpoint: &ImageEndpoint,
    api_key: &str,
    prompt: &str,
) -> Result<String> {
    let response = client
        .post(format!(
            "{}/v1/generation/stable-diffusion-v1-6/text-to-image",
            endpoint.base_url
        ))
        .bearer_auth(api_key)
        .header("accept", "application/json")
        .json(&json!({
            "text_prompts": [{"text": prompt}],
            "cfg_scale": 7,
            "height": 1024,
            "width": 1024,
            "samples": 1,
            "steps": 30,
        }))
        .send()
        .await
        .map_err(|e| transport_err("stability", e))?;

    let body: StabilityResponse = check_status("stability", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("stability", e))?;

    body.artifacts
        .into_iter()
        .next()
        .map(|a| format!("data:image/png;base64,{}", a.base64))
        .ok_or_else(|| BlogWriterError::Image("stability: response contained no artifact".into()))
}

// ---------------------------------------------------------------------------
// Unsplash
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

pub(crate) async fn unsplash(
    client: &Client,
    endpoint: &ImageEndpoint,
    access_key: &str,
    query: &str,
) -> Result<String> {
    let response = client
        .get(format!("{}/photos/random", endpoint.base_url))
        .query(&[("query", query), ("orientation", "landscape")])
        .header("authorization", format!("Client-ID {access_key}"))
        .send()
        .await
        .map_err(|e| transport_err("unsplash", e))?;

    let photo: UnsplashPhoto = check_status("unsplash", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("unsplash", e))?;

    Ok(photo.urls.regular)
}

// ---------------------------------------------------------------------------
// Pexels
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PexelsSearch {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    large: String,
}

pub(crate) async fn pexels(
    client: &Client,
    endpoint: &ImageEndpoint,
    api_key: &str,
    query: &str,
) -> Result<String> {
    let response = client
        .get(format!("{}/v1/search", endpoint.base_url))
        .query(&[("query", query), ("per_page", "1")])
        .header("authorization", api_key)
        .send()
        .await
        .map_err(|e| transport_err("pexels", e))?;

    let search: PexelsSearch = check_status("pexels", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("pexels", e))?;

    // No match is not an error.
    Ok(search
        .photos
        .into_iter()
        .next()
        .map(|p| p.src.large)
        .unwrap_or_default())
}
