//! LLM completion client for an OpenAI-compatible Responses API
//!
//! Used as the backend of the intent classifier adapter.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::classifier::TextCompletion;
use crate::config::LlmSettings;

/// Request body for the Responses API
#[derive(Serialize)]
struct ResponsesApiRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from the Responses API
#[derive(Deserialize, Debug)]
struct ResponsesApiResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize, Debug)]
struct ContentItem {
    #[serde(default)]
    text: Option<String>,
}

pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }

    /// Send one prompt and return the text output
    pub fn call(&self, input: &str) -> Result<String> {
        let url = format!("{}/responses", self.base_url);
        debug!(%url, model = %self.model, "calling LLM");

        let mut request = self.client.post(&url).json(&ResponsesApiRequest {
            model: &self.model,
            input,
        });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| anyhow!("LLM request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("LLM error {}: {}", status, body));
        }

        let resp: ResponsesApiResponse = response
            .json()
            .map_err(|e| anyhow!("Failed to parse LLM response: {}", e))?;

        extract_text_from_response(&resp)
    }
}

impl TextCompletion for LlmClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.call(prompt)
    }
}

/// Extract text content from a Responses API response
fn extract_text_from_response(resp: &ResponsesApiResponse) -> Result<String> {
    let mut chunks: Vec<&str> = resp
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter_map(|content| content.text.as_deref())
        .collect();

    // Fallback to output_text if no content found
    if chunks.is_empty() {
        if let Some(ref text) = resp.output_text {
            chunks.push(text);
        }
    }

    if chunks.is_empty() {
        return Err(anyhow!("No text found in LLM response"));
    }

    Ok(chunks.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> LlmSettings {
        LlmSettings {
            enabled: true,
            base_url: base_url.to_string(),
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_extract_text_prefers_content() {
        let resp: ResponsesApiResponse = serde_json::from_value(serde_json::json!({
            "output": [{ "content": [{ "text": " status " }] }],
            "output_text": "ignored"
        }))
        .unwrap();
        assert_eq!(extract_text_from_response(&resp).unwrap(), "status");
    }

    #[test]
    fn test_extract_text_falls_back_to_output_text() {
        let resp: ResponsesApiResponse =
            serde_json::from_value(serde_json::json!({ "output_text": "fare" })).unwrap();
        assert_eq!(extract_text_from_response(&resp).unwrap(), "fare");

        let empty: ResponsesApiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(extract_text_from_response(&empty).is_err());
    }

    #[test]
    fn test_call_against_mock_server() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/responses")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "model": "test-model" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"output":[{"content":[{"text":"ontime"}]}]}"#)
            .create();

        let client = LlmClient::new(&settings(&format!("{}/v1/", server.url())), Some("secret".to_string())).unwrap();
        assert_eq!(client.complete("classify me").unwrap(), "ontime");
        mock.assert();
    }

    #[test]
    fn test_call_reports_http_errors() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/responses")
            .with_status(503)
            .with_body("overloaded")
            .create();

        let client = LlmClient::new(&settings(&server.url()), None).unwrap();
        let err = client.call("classify me").unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
