// src/pipeline/synthesis.rs
// Synthesis stage: rewrite the prompt around the reasoning and stream the answer

use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::handoff::HandoffReceiver;
use super::merger::StageOutput;
use crate::error::Result;
use crate::llm::{AnswerSource, ChunkKind, Message, ModelArgs, Role};

/// Stands in for reasoning that could not be extracted
pub const REASONING_PLACEHOLDER: &str = "Failed to retrieve reasoning content";

/// Rewritten content of the final user turn
pub fn synthesis_prompt(original: &str, reasoning: &str) -> String {
    format!(
        "Here's my original input:\n{original}\n\n\
         Here's my another model's reasoning process:\n{reasoning}\n\n\
         Based on this reasoning, provide your response directly to me:"
    )
}

/// Drop every system message. Applying it twice changes nothing.
pub fn strip_system(messages: Vec<Message>) -> Vec<Message> {
    messages.into_iter().filter(|m| m.role != Role::System).collect()
}

/// Copy the conversation, embed the reasoning into the last turn if it is a
/// user turn, and remove system messages.
pub fn build_synthesis_messages(messages: &[Message], reasoning: &str) -> Vec<Message> {
    let mut rewritten = messages.to_vec();
    if let Some(last) = rewritten.last_mut()
        && last.role == Role::User
    {
        last.content = synthesis_prompt(&last.content, reasoning);
    }
    strip_system(rewritten)
}

/// Substitute the placeholder for empty reasoning
pub fn resolve_reasoning(reasoning: String) -> String {
    if reasoning.is_empty() {
        warn!("No reasoning content received, continuing with placeholder");
        REASONING_PLACEHOLDER.to_string()
    } else {
        reasoning
    }
}

/// Streaming synthesis stage. Waits for the hand-off, then forwards answer
/// chunks until the provider finishes or fails. Always signals completion.
pub async fn run_synthesis_stage(
    source: Arc<dyn AnswerSource>,
    messages: Vec<Message>,
    model: String,
    args: ModelArgs,
    handoff: HandoffReceiver,
    output: StageOutput,
) {
    info!("Waiting for reasoning hand-off");
    let reasoning = resolve_reasoning(handoff.receive().await);

    let prompt = build_synthesis_messages(&messages, &reasoning);
    info!(
        provider = source.provider(),
        model = %model,
        message_count = prompt.len(),
        "Synthesis stage started"
    );

    let mut chunks = source.stream_answer(prompt, &model, args, true);
    let mut emitted = 0usize;
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) if chunk.kind == ChunkKind::Answer => {
                if !output.emit(chunk).await {
                    break;
                }
                emitted += 1;
            }
            Ok(_) => {}
            Err(e) => {
                error!(provider = source.provider(), error = %e, emitted, "Synthesis stream failed");
                break;
            }
        }
    }

    output.finish().await;
    info!(emitted, "Synthesis stage finished");
}

/// Run synthesis once and return the whole answer
pub async fn collect_answer(
    source: &dyn AnswerSource,
    prompt: Vec<Message>,
    model: &str,
    args: ModelArgs,
) -> Result<String> {
    let mut chunks = source.stream_answer(prompt, model, args, false);
    let mut answer = String::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if chunk.kind == ChunkKind::Answer {
            answer.push_str(&chunk.text);
        }
    }

    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_last_user_message() {
        let messages = vec![
            Message::system("be terse"),
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("What is 2+2?"),
        ];
        let out = build_synthesis_messages(&messages, "add two and two");

        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|m| m.role != Role::System));
        let last = out.last().unwrap();
        assert!(last.content.contains("What is 2+2?"));
        assert!(last.content.contains("add two and two"));
        assert!(last.content.starts_with("Here's my original input:\n"));
        assert!(last.content.ends_with("provide your response directly to me:"));
        // Earlier turns untouched
        assert_eq!(out[0], Message::user("first"));
    }

    #[test]
    fn test_non_user_last_message_unchanged() {
        let messages = vec![Message::system("sys"), Message::user("q"), Message::assistant("partial")];
        let out = build_synthesis_messages(&messages, "reasoning");
        assert_eq!(out, vec![Message::user("q"), Message::assistant("partial")]);
    }

    #[test]
    fn test_original_messages_not_mutated() {
        let messages = vec![Message::user("q")];
        let _ = build_synthesis_messages(&messages, "r");
        assert_eq!(messages, vec![Message::user("q")]);
    }

    #[test]
    fn test_strip_system_idempotent() {
        let clean = vec![Message::user("a"), Message::assistant("b")];
        assert_eq!(strip_system(clean.clone()), clean);
        assert_eq!(strip_system(strip_system(clean.clone())), clean);
    }

    #[test]
    fn test_empty_conversation() {
        assert!(build_synthesis_messages(&[], "r").is_empty());
    }

    #[test]
    fn test_resolve_reasoning() {
        assert_eq!(resolve_reasoning(String::new()), REASONING_PLACEHOLDER);
        // Only a missing hand-off is replaced; whitespace is real output
        assert_eq!(resolve_reasoning("  \n".to_string()), "  \n");
        assert_eq!(resolve_reasoning("real".to_string()), "real");
    }

    #[test]
    fn test_prompt_template() {
        assert_eq!(
            synthesis_prompt("hi", "think"),
            "Here's my original input:\nhi\n\nHere's my another model's reasoning process:\nthink\n\nBased on this reasoning, provide your response directly to me:"
        );
    }
}
