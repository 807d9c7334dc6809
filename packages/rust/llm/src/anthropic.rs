//! Anthropic messages API.

use blogwriter_shared::{BlogWriterError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Endpoint, check_status, transport_err};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

pub(crate) async fn complete(
    client: &Client,
    endpoint: &Endpoint,
    api_key: &str,
    prompt: &str,
    temperature: f32,
) -> Result<String> {
    let request = MessagesRequest {
        model: &endpoint.model,
        max_tokens: MAX_TOKENS,
        temperature,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
    };

    let response = client
        .post(format!("{}/v1/messages", endpoint.base_url))
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&request)
        .send()
        .await
        .map_err(|e| transport_err("anthropic", e))?;

    let body: MessagesResponse = check_status("anthropic", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("anthropic", e))?;

    let text: String = body
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(BlogWriterError::Model(
            "anthropic: response contained no text".into(),
        ));
    }
    Ok(text)
}
