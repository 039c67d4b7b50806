//! OpenAI-compatible Chat Completions streaming
//!
//! DeepSeek, Gemini's OpenAI endpoint, OpenRouter and OneAPI all speak this
//! wire format; the adapters differ only in URL, auth and how reasoning is
//! separated from content.

use futures::StreamExt;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::Value;

use super::think::ThinkSplitter;
use super::{Chunk, ChunkStream, sse};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// Parse one `data:` payload into the first choice's delta
pub(crate) fn parse_delta(data: &str) -> Result<Option<StreamDelta>> {
    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(chunk.choices.into_iter().next().and_then(|c| c.delta))
}

/// Stream reasoning/content chunks from a chat-completions SSE response.
///
/// Native mode maps `reasoning_content` and `content` one to one. Inferred
/// mode routes `content` through a `<think>` splitter; any native
/// `reasoning_content` the upstream still sends is passed through.
pub(crate) fn reasoning_stream(request: RequestBuilder, provider: &'static str, origin_reasoning: bool) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut events = sse::data_stream(request, provider);
        let mut splitter = ThinkSplitter::new();

        while let Some(data) = events.next().await {
            let Some(delta) = parse_delta(&data?)? else {
                continue;
            };

            if let Some(reasoning) = delta.reasoning_content.filter(|r| !r.is_empty()) {
                yield Chunk::reasoning(reasoning);
            }

            let Some(content) = delta.content.filter(|c| !c.is_empty()) else {
                continue;
            };

            if origin_reasoning {
                yield Chunk::answer(content);
            } else {
                for chunk in splitter.push(&content) {
                    yield chunk;
                }
            }
        }

        for chunk in splitter.finish() {
            yield chunk;
        }
    })
}

/// Stream answer chunks (`delta.content`) from a chat-completions SSE response
pub(crate) fn answer_stream(request: RequestBuilder, provider: &'static str) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let mut events = sse::data_stream(request, provider);

        while let Some(data) = events.next().await {
            let content = parse_delta(&data?)?.and_then(|d| d.content);
            if let Some(content) = content.filter(|c| !c.is_empty()) {
                yield Chunk::answer(content);
            }
        }
    })
}

/// Extract `choices[0].message.content` from a non-streaming response
pub(crate) fn completion_text(body: &Value) -> Option<String> {
    body["choices"][0]["message"]["content"].as_str().map(String::from)
}
