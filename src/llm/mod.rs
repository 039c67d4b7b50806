// src/llm/mod.rs
// Provider message types and stream adapters for the reasoning and synthesis backends

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RelayError, Result};

pub mod claude;
pub mod deepseek;
pub mod gemini;
mod openai_compat;
mod sse;
pub mod think;
pub mod tokens;

pub use claude::{ClaudeClient, ClaudeProvider};
pub use deepseek::DeepSeekClient;
pub use gemini::GeminiClient;
pub use tokens::{RegexTokenCounter, TiktokenCounter, TokenCounter};

/// Conversation roles accepted by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// What a streamed chunk carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Chain-of-thought text
    Reasoning,
    /// Final answer text (`content` on the reasoning provider's wire)
    Answer,
}

/// One unit of streamed provider output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub text: String,
}

impl Chunk {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self { kind: ChunkKind::Reasoning, text: text.into() }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self { kind: ChunkKind::Answer, text: text.into() }
    }
}

/// Sampling parameters forwarded untouched to the synthesis provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelArgs {
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.9,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

/// Lazy per-call chunk sequence. Nothing touches the network until polled,
/// and dropping the stream releases the connection.
pub type ChunkStream = BoxStream<'static, Result<Chunk>>;

/// Provider that emits a chain-of-thought followed by its own answer
pub trait ReasoningSource: Send + Sync {
    /// Provider name for logging
    fn provider(&self) -> &'static str;

    /// Stream tagged chunks. With `origin_reasoning` the upstream separates
    /// reasoning natively; otherwise it is inferred from `<think>` tags.
    fn stream_reasoning(&self, messages: Vec<Message>, model: &str, origin_reasoning: bool) -> ChunkStream;
}

/// Provider that produces the final answer
pub trait AnswerSource: Send + Sync {
    /// Provider name for logging
    fn provider(&self) -> &'static str;

    /// Stream answer chunks. With `stream == false` the upstream is called
    /// once and the whole answer arrives as a single chunk.
    fn stream_answer(&self, messages: Vec<Message>, model: &str, args: ModelArgs, stream: bool) -> ChunkStream;
}

/// Reasoning provider selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasoningProvider {
    DeepSeek,
    Gemini,
}

impl FromStr for ReasoningProvider {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "gemini" => Ok(Self::Gemini),
            other => Err(RelayError::Config(format!("unsupported reasoning provider: {}", other))),
        }
    }
}

impl fmt::Display for ReasoningProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeepSeek => write!(f, "deepseek"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");

        let parsed: Message = serde_json::from_str(r#"{"role":"system","content":"be brief"}"#).unwrap();
        assert_eq!(parsed, Message::system("be brief"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let parsed = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_reasoning_provider_parse() {
        assert_eq!("deepseek".parse::<ReasoningProvider>().unwrap(), ReasoningProvider::DeepSeek);
        assert_eq!(" Gemini ".parse::<ReasoningProvider>().unwrap(), ReasoningProvider::Gemini);

        let err = "openai".parse::<ReasoningProvider>().unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_model_args_default() {
        let args = ModelArgs::default();
        assert_eq!(args.temperature, 0.5);
        assert_eq!(args.top_p, 0.9);
        assert_eq!(args.presence_penalty, 0.0);
        assert_eq!(args.frequency_penalty, 0.0);
    }
}
