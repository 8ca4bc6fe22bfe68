//! OpenAI chat completions client used as the [`VisionBackend`].

use std::time::Duration;

use async_trait::async_trait;
use recipe_core::backends::VisionBackend;
use recipe_core::protocol::BackendError;
use recipe_core::types::InputRef;
use serde_json::{json, Value};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Upper bound on a single completion request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Sampling parameters sent with every request.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: 2048,
            top_p: 1.0,
        }
    }
}

/// Errors from the completions endpoint.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Completion API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

/// HTTP client for an OpenAI-compatible chat completions API.
pub struct OpenAiVision {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    params: CompletionParams,
}

impl OpenAiVision {
    pub fn new(
        base_url: String,
        api_key: String,
        params: CompletionParams,
    ) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            params,
        })
    }

    /// Build the request body: one user message with the prompt text and the image.
    fn request_body(&self, prompt: &str, image: &InputRef) -> Value {
        json!({
            "model": self.params.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image.to_image_url()}}
                ]
            }],
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
            "top_p": self.params.top_p,
            "frequency_penalty": 0,
            "presence_penalty": 0
        })
    }

    /// Send one completion request and return the raw response JSON.
    pub async fn create_completion(
        &self,
        prompt: &str,
        image: &InputRef,
    ) -> Result<Value, VisionError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, image))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(VisionError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let completion: Value = response.json().await?;
        tracing::debug!(
            model = %self.params.model,
            choices = completion["choices"].as_array().map_or(0, Vec::len),
            "Completion received",
        );
        Ok(completion)
    }
}

#[async_trait]
impl VisionBackend for OpenAiVision {
    async fn complete(&self, prompt: &str, image: &InputRef) -> Result<Value, BackendError> {
        Ok(self.create_completion(prompt, image).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use mockito::Matcher;

    use super::*;

    fn vision(url: String) -> OpenAiVision {
        OpenAiVision::new(url, "sk-test".into(), CompletionParams::default()).unwrap()
    }

    #[test]
    fn inline_images_are_sent_as_data_urls() {
        let image = InputRef::Base64 {
            data: "AAAA".into(),
            mime: "image/jpeg".into(),
        };
        let body = vision("http://x".into()).request_body("Give me a recipe", &image);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["content"][0]["text"], "Give me a recipe");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[tokio::test]
    async fn completion_json_is_returned_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"max_tokens": 2048})))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": "Pancakes"}}]}"#)
            .create_async()
            .await;

        let completion = vision(server.url())
            .create_completion("p", &InputRef::Url("https://blob/a.jpg".into()))
            .await
            .unwrap();
        assert_eq!(completion["choices"][0]["message"]["content"], "Pancakes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = vision(server.url())
            .create_completion("p", &InputRef::Url("u".into()))
            .await
            .unwrap_err();
        assert_matches!(err, VisionError::ApiError { status: 429, .. });
    }
}
