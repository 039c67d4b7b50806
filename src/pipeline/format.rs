// src/pipeline/format.rs
// OpenAI-compatible wire shapes for merged output

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::merger::OutputEnvelope;
use crate::llm::{ChunkKind, Role};

/// Literal terminal frame of a streaming response
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Per-call identifiers, created once and shared by every frame
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Arc<str>,
    /// Unix seconds
    pub created: i64,
}

impl Session {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Arc::from(format!("chatcmpl-{:x}", now.timestamp_millis())),
            created: now.timestamp(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Streaming
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk<'a> {
    pub id: &'a str,
    pub object: &'static str,
    pub created: i64,
    pub model: &'a str,
    pub choices: [ChunkChoice<'a>; 1],
}

#[derive(Debug, Serialize)]
pub struct ChunkChoice<'a> {
    pub index: u32,
    pub delta: ChunkDelta<'a>,
}

/// Both text fields are always present; only the one matching the chunk
/// kind is non-empty.
#[derive(Debug, Serialize)]
pub struct ChunkDelta<'a> {
    pub role: Role,
    pub reasoning_content: &'a str,
    pub content: &'a str,
}

impl<'a> ChatCompletionChunk<'a> {
    pub fn from_envelope(envelope: &'a OutputEnvelope) -> Self {
        let text = envelope.chunk.text.as_str();
        let (reasoning_content, content) = match envelope.chunk.kind {
            ChunkKind::Reasoning => (text, ""),
            ChunkKind::Answer => ("", text),
        };

        Self {
            id: &envelope.id,
            object: "chat.completion.chunk",
            created: envelope.created,
            model: &envelope.model,
            choices: [ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: Role::Assistant,
                    reasoning_content,
                    content,
                },
            }],
        }
    }
}

/// Serialize one envelope as an SSE `data:` frame
pub fn encode_frame(envelope: &OutputEnvelope) -> String {
    let chunk = ChatCompletionChunk::from_envelope(envelope);
    format!("data: {}\n\n", serde_json::to_string(&chunk).unwrap_or_default())
}

// ============================================================================
// Non-streaming
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
    pub reasoning_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl ChatCompletion {
    pub fn new(session: &Session, model: &str, reasoning: String, answer: String, usage: Usage) -> Self {
        Self {
            id: session.id.to_string(),
            object: "chat.completion".to_string(),
            created: session.created,
            model: model.to_string(),
            choices: vec![CompletionChoice {
                index: 0,
                message: CompletionMessage {
                    role: Role::Assistant,
                    content: answer,
                    reasoning_content: reasoning,
                },
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }

    /// Answer text of the first choice
    pub fn answer(&self) -> &str {
        self.choices.first().map(|c| c.message.content.as_str()).unwrap_or("")
    }

    /// Reasoning text of the first choice
    pub fn reasoning(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.reasoning_content.as_str())
            .unwrap_or("")
    }
}
