//! OpenAI chat completions.

use blogwriter_shared::{BlogWriterError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Endpoint, check_status, transport_err};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub(crate) async fn complete(
    client: &Client,
    endpoint: &Endpoint,
    api_key: &str,
    prompt: &str,
    temperature: f32,
) -> Result<String> {
    let request = ChatRequest {
        model: &endpoint.model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature,
    };

    let response = client
        .post(format!("{}/v1/chat/completions", endpoint.base_url))
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| transport_err("openai", e))?;

    let body: ChatResponse = check_status("openai", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("openai", e))?;

    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| BlogWriterError::Model("openai: response contained no message".into()))
}
