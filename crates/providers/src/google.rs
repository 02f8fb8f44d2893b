//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API. Auth is via an API key
//! passed as a query parameter (`key={api_key}`). System messages are carried
//! in `systemInstruction`; assistant turns map to the `model` role.

use serde_json::Value;

use viva_domain::chat::Role;
use viva_domain::error::{Error, Result};

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// An LLM provider adapter for the Google Gemini API.
pub struct GoogleProvider {
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: &str, default_model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            default_model: default_model.to_string(),
            client,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let mut contents: Vec<Value> = Vec::new();
        let mut system_texts: Vec<String> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                // Gemini takes system text out-of-band; multiple system
                // injections concatenate in order.
                Role::System => system_texts.push(msg.content.clone()),
                Role::User => contents.push(serde_json::json!({
                    "role": "user",
                    "parts": [{"text": msg.content}],
                })),
                Role::Assistant => contents.push(serde_json::json!({
                    "role": "model",
                    "parts": [{"text": msg.content}],
                })),
            }
        }

        let mut body = serde_json::json!({ "contents": contents });

        if !system_texts.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": system_texts.join("\n\n")}]
            });
        }

        let mut gen_config = serde_json::json!({});
        if let Some(temp) = req.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max);
        }
        if gen_config.as_object().is_some_and(|o| !o.is_empty()) {
            body["generationConfig"] = gen_config;
        }

        body
    }
}

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = self.generate_url(&model);
        let body = self.build_body(&req);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("request failed")
                .to_string();
            return Err(Error::Provider {
                provider: "google".into(),
                message: format!("{status}: {message}"),
            });
        }

        let content = payload["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(ChatResponse { content, model })
    }

    fn provider_id(&self) -> &str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viva_domain::chat::Message;

    #[test]
    fn system_messages_go_to_system_instruction() {
        let provider = GoogleProvider::new("k", "gemini-2.5-flash").unwrap();
        let req = ChatRequest {
            messages: vec![
                Message::system("phase one"),
                Message::user("hello"),
                Message::assistant("hi"),
                Message::system("phase two"),
            ],
            ..Default::default()
        };
        let body = provider.build_body(&req);

        let instruction = body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("phase one"));
        assert!(instruction.contains("phase two"));

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn url_embeds_model_and_key() {
        let provider = GoogleProvider::new("secret", "gemini-2.5-flash").unwrap();
        let url = provider.generate_url("gemini-2.5-flash");
        assert!(url.contains("models/gemini-2.5-flash:generateContent"));
        assert!(url.ends_with("key=secret"));
    }
}
