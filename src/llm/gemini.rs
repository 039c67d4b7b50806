// src/llm/gemini.rs
// Gemini reasoning provider via Google's OpenAI-compatible endpoint

use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{ChunkStream, Message, ReasoningSource, openai_compat};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

/// Gemini API client (OpenAI compatibility layer)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, api_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.unwrap_or_else(|| GEMINI_API_URL.to_string()),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl ReasoningSource for GeminiClient {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn stream_reasoning(&self, messages: Vec<Message>, model: &str, origin_reasoning: bool) -> ChunkStream {
        debug!(model, message_count = messages.len(), origin_reasoning, "Gemini reasoning request");

        let body = json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        let request = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body);

        openai_compat::reasoning_stream(request, self.provider(), origin_reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        let client = GeminiClient::new("key", None);
        assert_eq!(client.api_url(), GEMINI_API_URL);
        assert_eq!(client.provider(), "gemini");
    }
}
