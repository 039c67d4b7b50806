// tests/test_helpers/mod.rs
// Scripted in-memory providers for pipeline and server tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reasoning_relay::error::RelayError;
use reasoning_relay::llm::{AnswerSource, Chunk, ChunkStream, Message, ModelArgs, ReasoningSource};
use reasoning_relay::pipeline::RelayPipeline;

/// One scripted adapter step
#[derive(Debug, Clone)]
pub enum Step {
    Yield(Chunk),
    Fail(&'static str),
    /// Never resolve (simulates a stalled upstream)
    Hang,
}

pub fn reasoning(text: &str) -> Step {
    Step::Yield(Chunk::reasoning(text))
}

pub fn answer(text: &str) -> Step {
    Step::Yield(Chunk::answer(text))
}

/// Sets a flag when the adapter stream is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn replay(steps: Vec<Step>, dropped: Arc<AtomicBool>) -> ChunkStream {
    Box::pin(async_stream::stream! {
        let _flag = DropFlag(dropped);
        for step in steps {
            match step {
                Step::Yield(chunk) => yield Ok(chunk),
                Step::Fail(message) => {
                    yield Err(RelayError::Stream(message.to_string()));
                    return;
                }
                Step::Hang => futures::future::pending::<()>().await,
            }
        }
    })
}

pub struct ScriptedReasoning {
    steps: Vec<Step>,
    pub dropped: Arc<AtomicBool>,
}

impl ScriptedReasoning {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ReasoningSource for ScriptedReasoning {
    fn provider(&self) -> &'static str {
        "scripted-reasoning"
    }

    fn stream_reasoning(&self, _messages: Vec<Message>, _model: &str, _origin_reasoning: bool) -> ChunkStream {
        replay(self.steps.clone(), self.dropped.clone())
    }
}

/// Records every prompt it is called with
pub struct ScriptedAnswer {
    steps: Vec<Step>,
    pub prompts: Arc<Mutex<Vec<Vec<Message>>>>,
    pub stream_flags: Arc<Mutex<Vec<bool>>>,
    pub dropped: Arc<AtomicBool>,
}

impl ScriptedAnswer {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            prompts: Arc::new(Mutex::new(Vec::new())),
            stream_flags: Arc::new(Mutex::new(Vec::new())),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn last_prompt(&self) -> Vec<Message> {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl AnswerSource for ScriptedAnswer {
    fn provider(&self) -> &'static str {
        "scripted-answer"
    }

    fn stream_answer(&self, messages: Vec<Message>, _model: &str, _args: ModelArgs, stream: bool) -> ChunkStream {
        self.prompts.lock().unwrap().push(messages);
        self.stream_flags.lock().unwrap().push(stream);
        replay(self.steps.clone(), self.dropped.clone())
    }
}

/// Pipeline over scripted providers, returning handles to inspect them
pub fn scripted_pipeline(
    reasoning_steps: Vec<Step>,
    answer_steps: Vec<Step>,
) -> (RelayPipeline, Arc<ScriptedReasoning>, Arc<ScriptedAnswer>) {
    let reasoning = Arc::new(ScriptedReasoning::new(reasoning_steps));
    let answer = Arc::new(ScriptedAnswer::new(answer_steps));
    let pipeline = RelayPipeline::new(reasoning.clone(), answer.clone(), true);
    (pipeline, reasoning, answer)
}

/// Parse a `data: {json}\n\n` frame
pub fn frame_json(frame: &str) -> serde_json::Value {
    let body = frame
        .strip_prefix("data: ")
        .and_then(|f| f.strip_suffix("\n\n"))
        .unwrap_or_else(|| panic!("malformed frame: {:?}", frame));
    serde_json::from_str(body).unwrap()
}

pub fn delta_field(frame: &str, field: &str) -> String {
    frame_json(frame)["choices"][0]["delta"][field]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
