use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::services::ai_service::ContentGenerator;

/// Google Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiService {
    pub fn new(api_key: String, model: String, base_url: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ContentGenerator for GeminiService {
    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ]
        });

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Service(format!("request to Gemini failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Service(format!("Gemini API Error {}: {}", status, text)));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| Error::Service(format!("unreadable Gemini response: {}", e)))?;

        extract_text(&body).ok_or_else(|| {
            let reason = body
                .get("promptFeedback")
                .and_then(|f| f.get("blockReason"))
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            Error::Service(format!("Gemini returned no text ({})", reason))
        })
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(body: &JsonValue) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
