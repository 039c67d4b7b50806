// src/pipeline/merger.rs
// Fan-in of both stages into one ordered output sequence

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::format::Session;
use crate::llm::Chunk;

/// Producers feeding the merger
pub const STAGE_COUNT: usize = 2;

/// Intake depth. Small on purpose: a slow consumer blocks the stages.
pub const INTAKE_CAPACITY: usize = 8;

/// Unit flowing through the merger
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEnvelope {
    pub id: Arc<str>,
    pub created: i64,
    pub model: Arc<str>,
    pub chunk: Chunk,
    /// Stage-completion signal; never forwarded to the caller
    pub finish: bool,
}

/// What the merger yields
#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    Envelope(OutputEnvelope),
    /// Every stage has finished. Yielded exactly once, last.
    End,
}

/// Shared intake channel both stages write into
pub fn intake() -> (mpsc::Sender<OutputEnvelope>, mpsc::Receiver<OutputEnvelope>) {
    mpsc::channel(INTAKE_CAPACITY)
}

/// One stage's handle on the intake
#[derive(Debug)]
pub struct StageOutput {
    tx: mpsc::Sender<OutputEnvelope>,
    session: Session,
    model: Arc<str>,
    stage: &'static str,
}

impl StageOutput {
    pub fn new(tx: mpsc::Sender<OutputEnvelope>, session: Session, model: impl Into<Arc<str>>, stage: &'static str) -> Self {
        Self {
            tx,
            session,
            model: model.into(),
            stage,
        }
    }

    fn envelope(&self, chunk: Chunk, finish: bool) -> OutputEnvelope {
        OutputEnvelope {
            id: self.session.id.clone(),
            created: self.session.created,
            model: self.model.clone(),
            chunk,
            finish,
        }
    }

    /// Forward one chunk, waiting while the intake is full. Returns false
    /// once the merger is gone, after which the stage should stop.
    pub async fn emit(&self, chunk: Chunk) -> bool {
        self.tx.send(self.envelope(chunk, false)).await.is_ok()
    }

    /// Signal this stage's completion. Consumes the handle, so it is sent
    /// exactly once per stage.
    pub async fn finish(self) {
        let envelope = self.envelope(Chunk::answer(""), true);
        if self.tx.send(envelope).await.is_err() {
            debug!(stage = self.stage, "Merger gone before stage finished");
        }
    }
}

/// Yield envelopes in arrival order until every stage has finished, then a
/// single `Merged::End`. If the intake closes early (a stage aborted without
/// finishing) the end marker is still produced.
pub fn merge(rx: mpsc::Receiver<OutputEnvelope>) -> BoxStream<'static, Merged> {
    Box::pin(async_stream::stream! {
        let mut intake = ReceiverStream::new(rx);
        let mut finished = 0usize;

        while finished < STAGE_COUNT {
            match intake.next().await {
                Some(envelope) if envelope.finish => {
                    finished += 1;
                    debug!(finished, "Stage finished");
                }
                Some(envelope) => yield Merged::Envelope(envelope),
                None => {
                    warn!(finished, expected = STAGE_COUNT, "Intake closed before every stage finished");
                    break;
                }
            }
        }

        yield Merged::End;
    })
}
