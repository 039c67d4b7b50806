// src/llm/deepseek.rs
// DeepSeek reasoning provider (OpenAI-compatible Chat Completions, streamed)

use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{ChunkStream, Message, ReasoningSource, openai_compat};

pub const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// DeepSeek API client
pub struct DeepSeekClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl DeepSeekClient {
    pub fn new(api_key: impl Into<String>, api_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.unwrap_or_else(|| DEEPSEEK_API_URL.to_string()),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl ReasoningSource for DeepSeekClient {
    fn provider(&self) -> &'static str {
        "deepseek"
    }

    fn stream_reasoning(&self, messages: Vec<Message>, model: &str, origin_reasoning: bool) -> ChunkStream {
        debug!(model, message_count = messages.len(), origin_reasoning, "DeepSeek reasoning request");

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
        let client = DeepSeekClient::new("key", None);
        assert_eq!(client.api_url(), DEEPSEEK_API_URL);
        assert_eq!(client.provider(), "deepseek");
    }

    #[test]
    fn test_custom_url() {
        let client = DeepSeekClient::new("key", Some("http://localhost:9000/v1/chat/completions".into()));
        assert_eq!(client.api_url(), "http://localhost:9000/v1/chat/completions");
    }
}
