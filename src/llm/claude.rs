// src/llm/claude.rs
// Claude synthesis provider: Anthropic Messages API, or OpenAI-compatible
// gateways (OpenRouter, OneAPI) in front of it

use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::{AnswerSource, Chunk, ChunkStream, Message, ModelArgs, openai_compat, sse};
use crate::error::{RelayError, Result};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENROUTER_CLAUDE_MODEL: &str = "anthropic/claude-3.5-sonnet";
const MAX_TOKENS: u32 = 8192;

/// Which gateway serves Claude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaudeProvider {
    Anthropic,
    OpenRouter,
    OneApi,
}

impl FromStr for ClaudeProvider {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openrouter" => Ok(Self::OpenRouter),
            "oneapi" => Ok(Self::OneApi),
            other => Err(RelayError::Config(format!("unsupported Claude provider: {}", other))),
        }
    }
}

impl fmt::Display for ClaudeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenRouter => write!(f, "openrouter"),
            Self::OneApi => write!(f, "oneapi"),
        }
    }
}

/// Claude API client
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    api_url: String,
    provider: ClaudeProvider,
}

impl ClaudeClient {
    /// OneAPI has no public default endpoint, so `api_url` is required for it
    pub fn new(api_key: impl Into<String>, api_url: Option<String>, provider: ClaudeProvider) -> Result<Self> {
        let api_url = match (api_url, provider) {
            (Some(url), _) => url,
            (None, ClaudeProvider::Anthropic) => ANTHROPIC_API_URL.to_string(),
            (None, ClaudeProvider::OpenRouter) => OPENROUTER_API_URL.to_string(),
            (None, ClaudeProvider::OneApi) => {
                return Err(RelayError::Config("CLAUDE_API_URL is required for the oneapi provider".into()));
            }
        };

        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url,
            provider,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn anthropic_request(&self, messages: &[Message], model: &str, args: ModelArgs, stream: bool) -> RequestBuilder {
        // Anthropic rejects the OpenAI penalty parameters
        let body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "stream": stream,
            "temperature": args.temperature,
            "top_p": args.top_p,
        });

        self.client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
    }

    fn gateway_request(&self, messages: &[Message], model: &str, args: ModelArgs, stream: bool) -> RequestBuilder {
        let body = json!({
            "model": gateway_model(self.provider, model),
            "messages": messages,
            "stream": stream,
            "temperature": args.temperature,
            "top_p": args.top_p,
            "presence_penalty": args.presence_penalty,
            "frequency_penalty": args.frequency_penalty,
        });

        let mut request = self.client.post(&self.api_url).bearer_auth(&self.api_key);
        if self.provider == ClaudeProvider::OpenRouter {
            request = request
                .header("HTTP-Referer", "https://github.com/reasoning-relay")
                .header("X-Title", "reasoning-relay");
        }
        request.json(&body)
    }
}

impl AnswerSource for ClaudeClient {
    fn provider(&self) -> &'static str {
        "claude"
    }

    fn stream_answer(&self, messages: Vec<Message>, model: &str, args: ModelArgs, stream: bool) -> ChunkStream {
        debug!(
            gateway = %self.provider,
            model,
            message_count = messages.len(),
            stream,
            "Claude synthesis request"
        );

        match (self.provider, stream) {
            (ClaudeProvider::Anthropic, true) => {
                anthropic_stream(self.anthropic_request(&messages, model, args, true))
            }
            (ClaudeProvider::Anthropic, false) => {
                single_answer(self.anthropic_request(&messages, model, args, false), anthropic_text)
            }
            (_, true) => openai_compat::answer_stream(self.gateway_request(&messages, model, args, true), "claude"),
            (_, false) => single_answer(
                self.gateway_request(&messages, model, args, false),
                openai_compat::completion_text,
            ),
        }
    }
}

/// OpenRouter addresses Claude by a namespaced model id
fn gateway_model(provider: ClaudeProvider, model: &str) -> String {
    if provider == ClaudeProvider::OpenRouter && !model.contains('/') {
        OPENROUTER_CLAUDE_MODEL.to_string()
    } else {
        model.to_string()
    }
}

// ============================================================================
// Anthropic Streaming
// ============================================================================

#[derive(Deserialize, Debug)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<AnthropicDelta>,
    error: Option<AnthropicError>,
}

#[derive(Deserialize, Debug)]
struct AnthropicDelta {
    #[serde(rename = "type")]
    delta_type: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AnthropicError {
    message: String,
}

/// What one Anthropic SSE payload means for the answer stream
#[derive(Debug, PartialEq)]
enum AnthropicEvent {
    Text(String),
    Stop,
    Error(String),
    Ignored,
}

fn parse_anthropic_event(data: &str) -> Result<AnthropicEvent> {
    let event: AnthropicStreamEvent = serde_json::from_str(data)?;

    Ok(match event.event_type.as_str() {
        "content_block_delta" => match event.delta {
            Some(AnthropicDelta { delta_type, text: Some(text) })
                if delta_type.as_deref().is_none_or(|t| t == "text_delta") =>
            {
                AnthropicEvent::Text(text)
            }
            _ => AnthropicEvent::Ignored,
        },
        "message_stop" => AnthropicEvent::Stop,
        "error" => AnthropicEvent::Error(
            event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown Anthropic stream error".to_string()),
        ),
        _ => AnthropicEvent::Ignored,
    })
}

fn anthropic_stream(request: RequestBuilder) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut events = sse::data_stream(request, "claude");

        while let Some(data) = events.next().await {
            match parse_anthropic_event(&data?)? {
                AnthropicEvent::Text(text) => {
                    if !text.is_empty() {
                        yield Chunk::answer(text);
                    }
                }
                AnthropicEvent::Stop => break,
                AnthropicEvent::Error(message) => {
                    Err::<(), _>(RelayError::Stream(format!("claude: {}", message)))?;
                }
                AnthropicEvent::Ignored => {}
            }
        }
    })
}

/// Concatenated text blocks of a non-streaming Messages API response
fn anthropic_text(body: &Value) -> Option<String> {
    let blocks = body["content"].as_array()?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    Some(text)
}

/// One request, whole answer yielded as a single chunk
fn single_answer(request: RequestBuilder, extract: fn(&Value) -> Option<String>) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let response = sse::check_status(request.send().await?, "claude").await?;
        let body: Value = response.json().await?;

        let text = extract(&body)
            .ok_or_else(|| RelayError::Stream("claude: no content in response".to_string()))?;
        if !text.is_empty() {
            yield Chunk::answer(text);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!("anthropic".parse::<ClaudeProvider>().unwrap(), ClaudeProvider::Anthropic);
        assert_eq!("OpenRouter".parse::<ClaudeProvider>().unwrap(), ClaudeProvider::OpenRouter);
        assert_eq!("oneapi".parse::<ClaudeProvider>().unwrap(), ClaudeProvider::OneApi);
        assert!(matches!("bedrock".parse::<ClaudeProvider>(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_default_urls() {
        let anthropic = ClaudeClient::new("k", None, ClaudeProvider::Anthropic).unwrap();
        assert_eq!(anthropic.api_url(), ANTHROPIC_API_URL);

        let openrouter = ClaudeClient::new("k", None, ClaudeProvider::OpenRouter).unwrap();
        assert_eq!(openrouter.api_url(), OPENROUTER_API_URL);
    }

    #[test]
    fn test_oneapi_requires_url() {
        let result = ClaudeClient::new("k", None, ClaudeProvider::OneApi);
        assert!(matches!(result, Err(RelayError::Config(_))));

        let client = ClaudeClient::new("k", Some("http://oneapi.local/v1/chat/completions".into()), ClaudeProvider::OneApi)
            .unwrap();
        assert_eq!(client.api_url(), "http://oneapi.local/v1/chat/completions");
    }

    #[test]
    fn test_gateway_model_mapping() {
        assert_eq!(
            gateway_model(ClaudeProvider::OpenRouter, "claude-3-5-sonnet-20241022"),
            OPENROUTER_CLAUDE_MODEL
        );
        assert_eq!(
            gateway_model(ClaudeProvider::OpenRouter, "anthropic/claude-3.7-sonnet"),
            "anthropic/claude-3.7-sonnet"
        );
        assert_eq!(gateway_model(ClaudeProvider::OneApi, "claude-3-5-sonnet"), "claude-3-5-sonnet");
    }

    #[test]
    fn test_parse_anthropic_text_delta() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#;
        assert_eq!(parse_anthropic_event(data).unwrap(), AnthropicEvent::Text("Hello".into()));
    }

    #[test]
    fn test_parse_anthropic_non_text_delta_ignored() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#;
        assert_eq!(parse_anthropic_event(data).unwrap(), AnthropicEvent::Ignored);
    }

    #[test]
    fn test_parse_anthropic_stop_and_error() {
        assert_eq!(parse_anthropic_event(r#"{"type":"message_stop"}"#).unwrap(), AnthropicEvent::Stop);

        let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(parse_anthropic_event(data).unwrap(), AnthropicEvent::Error("Overloaded".into()));

        assert_eq!(parse_anthropic_event(r#"{"type":"ping"}"#).unwrap(), AnthropicEvent::Ignored);
    }

    #[test]
    fn test_anthropic_text_concatenates_blocks() {
        let body = json!({
            "content": [
                {"type": "text", "text": "x"},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "y"}
            ]
        });
        assert_eq!(anthropic_text(&body).as_deref(), Some("xy"));
        assert!(anthropic_text(&json!({})).is_none());
    }
}
