// src/pipeline/reasoning.rs
// Reasoning stage: forward chain-of-thought, then hand it off once

use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info};

use super::handoff::{HandoffSender, ReasoningAccumulator};
use super::merger::StageOutput;
use crate::error::Result;
use crate::llm::{ChunkKind, Message, ReasoningSource};

/// Consume the reasoning provider until its answer begins (or its stream
/// ends) and return the concatenated reasoning.
///
/// Each reasoning chunk is forwarded to `output` as it arrives. The provider's
/// own answer chunk marks the end of reasoning and is not forwarded.
/// Adapter errors are returned to the caller.
pub async fn drive(
    source: &dyn ReasoningSource,
    messages: Vec<Message>,
    model: &str,
    origin_reasoning: bool,
    output: Option<&StageOutput>,
) -> Result<String> {
    let mut chunks = source.stream_reasoning(messages, model, origin_reasoning);
    let mut accumulator = ReasoningAccumulator::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        match chunk.kind {
            ChunkKind::Reasoning => {
                accumulator.push(chunk.text.clone());
                if let Some(output) = output
                    && !output.emit(chunk).await
                {
                    break;
                }
            }
            ChunkKind::Answer => break,
        }
    }

    Ok(accumulator.freeze())
}

/// Streaming reasoning stage. Always delivers the hand-off (the empty
/// sentinel on failure) and then signals completion to the merger.
pub async fn run_reasoning_stage(
    source: Arc<dyn ReasoningSource>,
    messages: Vec<Message>,
    model: String,
    origin_reasoning: bool,
    output: StageOutput,
    handoff: HandoffSender,
) {
    info!(provider = source.provider(), model = %model, "Reasoning stage started");

    let reasoning = match drive(source.as_ref(), messages, &model, origin_reasoning, Some(&output)).await {
        Ok(reasoning) => {
            info!(reasoning_len = reasoning.len(), "Reasoning complete, handing off");
            reasoning
        }
        Err(e) => {
            error!(provider = source.provider(), error = %e, "Reasoning stream failed");
            String::new()
        }
    };

    handoff.deliver(reasoning);
    output.finish().await;
    info!("Reasoning stage finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::llm::{Chunk, ChunkStream};
    use crate::pipeline::format::Session;
    use crate::pipeline::handoff::handoff;
    use crate::pipeline::merger::{Merged, intake, merge};

    /// Scripted provider replaying fixed items
    struct Scripted(Vec<std::result::Result<Chunk, &'static str>>);

    impl ReasoningSource for Scripted {
        fn provider(&self) -> &'static str {
            "scripted"
        }

        fn stream_reasoning(&self, _messages: Vec<Message>, _model: &str, _origin: bool) -> ChunkStream {
            let items: Vec<Result<Chunk>> = self
                .0
                .iter()
                .map(|item| item.clone().map_err(|e| RelayError::Stream(e.to_string())))
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    fn messages() -> Vec<Message> {
        vec![Message::user("1+1?")]
    }

    #[tokio::test]
    async fn test_drive_stops_at_first_answer() {
        let source = Scripted(vec![
            Ok(Chunk::reasoning("a")),
            Ok(Chunk::reasoning("b")),
            Ok(Chunk::answer("2")),
            Ok(Chunk::reasoning("never")),
        ]);
        let reasoning = drive(&source, messages(), "m", true, None).await.unwrap();
        assert_eq!(reasoning, "ab");
    }

    #[tokio::test]
    async fn test_drive_without_answer_still_returns() {
        let source = Scripted(vec![Ok(Chunk::reasoning("only thinking"))]);
        let reasoning = drive(&source, messages(), "m", true, None).await.unwrap();
        assert_eq!(reasoning, "only thinking");
    }

    #[tokio::test]
    async fn test_drive_propagates_adapter_error() {
        let source = Scripted(vec![Ok(Chunk::reasoning("a")), Err("connection reset")]);
        let result = drive(&source, messages(), "m", true, None).await;
        assert!(matches!(result, Err(RelayError::Stream(_))));
    }

    #[tokio::test]
    async fn test_stage_failure_delivers_empty_sentinel() {
        let source: Arc<dyn ReasoningSource> = Arc::new(Scripted(vec![Err("boom")]));
        let (tx, rx) = intake();
        let output = StageOutput::new(tx, Session::new(), "m", "reasoning");
        let (handoff_tx, handoff_rx) = handoff();

        run_reasoning_stage(source, messages(), "m".into(), true, output, handoff_tx).await;

        assert_eq!(handoff_rx.receive().await, "");
        // Finish signal was sent even though the stream failed
        let mut rx = rx;
        let finish = rx.recv().await.unwrap();
        assert!(finish.finish);
    }

    #[tokio::test]
    async fn test_stage_forwards_reasoning_but_not_answer() {
        let source: Arc<dyn ReasoningSource> = Arc::new(Scripted(vec![
            Ok(Chunk::reasoning("r1")),
            Ok(Chunk::reasoning("r2")),
            Ok(Chunk::answer("own answer")),
        ]));
        let (tx, rx) = intake();
        let output = StageOutput::new(tx.clone(), Session::new(), "reasoner", "reasoning");
        let other = StageOutput::new(tx, Session::new(), "synth", "synthesis");
        let (handoff_tx, handoff_rx) = handoff();

        let stage = tokio::spawn(run_reasoning_stage(source, messages(), "reasoner".into(), true, output, handoff_tx));
        let merged = tokio::spawn(merge(rx).collect::<Vec<_>>());

        assert_eq!(handoff_rx.receive().await, "r1r2");
        other.finish().await;
        stage.await.unwrap();

        let merged = merged.await.unwrap();
        let texts: Vec<&str> = merged
            .iter()
            .filter_map(|m| match m {
                Merged::Envelope(e) => Some(e.chunk.text.as_str()),
                Merged::End => None,
            })
            .collect();
        assert_eq!(texts, vec!["r1", "r2"]);
        assert_eq!(merged.last(), Some(&Merged::End));
    }
}
