use crate::traits::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: [OllamaMessage<'a>; 1],
    /// Constrains the model to emit a JSON document.
    format: &'a str,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.2,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Empty content is passed on so the decision parser can reject it and
    /// the engine can send its corrective prompt.
    fn extract_text(response: OllamaResponse) -> String {
        let content = response.message.content.unwrap_or_default();
        if content.trim().is_empty()
            && let Some(thinking) = response.message.thinking.filter(|t| !t.is_empty())
        {
            warn!(
                thinking_chars = thinking.chars().count(),
                "ollama returned reasoning but no answer"
            );
        }
        content
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let ollama_request = OllamaRequest {
            model: &self.model,
            messages: [OllamaMessage {
                role: "user",
                content: prompt,
            }],
            format: "json",
            options: OllamaOptions {
                temperature: self.temperature,
            },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Ollama API error ({}): {}",
                status,
                error_text
            ));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        Ok(Self::extract_text(ollama_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> OllamaResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn content_is_returned() {
        let text = OllamaProvider::extract_text(parse(
            r#"{"message":{"role":"assistant","content":"{\"thought\":\"x\"}"},"done":true}"#,
        ));
        assert_eq!(text, r#"{"thought":"x"}"#);
    }

    #[test]
    fn thinking_only_yields_empty_text() {
        let text = OllamaProvider::extract_text(parse(
            r#"{"message":{"content":"","thinking":"hmm"}}"#,
        ));
        assert_eq!(text, "");
    }

    #[test]
    fn missing_content_yields_empty_text() {
        assert_eq!(OllamaProvider::extract_text(parse(r#"{"message":{"content":null}}"#)), "");
    }
}
