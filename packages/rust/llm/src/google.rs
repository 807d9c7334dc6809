//! Google Gemini `generateContent`.

use blogwriter_shared::{BlogWriterError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Endpoint, check_status, transport_err};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
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
    let request = GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: GenerationConfig { temperature },
    };

    let response = client
        .post(format!(
            "{}/v1beta/models/{}:generateContent",
            endpoint.base_url, endpoint.model
        ))
        .query(&[("key", api_key)])
        .json(&request)
        .send()
        .await
        .map_err(|e| transport_err("google", e))?;

    let body: GenerateResponse = check_status("google", response)
        .await?
        .json()
        .await
        .map_err(|e| transport_err("google", e))?;

    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| BlogWriterError::Model("google: response contained no candidates".into()))?;

    Ok(candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect())
}

#[cfg(test)]
mod tests {
    use blogwriter_shared::{LanguageModel, LlmProvider};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_support::router;

    #[tokio::test]
    async fn reads_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "{\"keywords\": [\"a\"]}"}]}}]
            })))
            .mount(&server)
            .await;

        let text = router(&server.uri())
            .complete("keywords please", LlmProvider::Google, 0.2)
            .await
            .expect("complete");
        assert_eq!(text, r#"{"keywords": ["a"]}"#);
    }

    #[tokio::test]
    async fn no_candidates_is_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = router(&server.uri())
            .complete("hi", LlmProvider::Google, 0.7)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }
}
