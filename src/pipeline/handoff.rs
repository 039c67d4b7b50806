// src/pipeline/handoff.rs
// Single-use reasoning hand-off between the two stages

use tokio::sync::oneshot;
use tracing::debug;

/// Writing half. `deliver` consumes the sender, so the slot can only ever be
/// written once.
#[derive(Debug)]
pub struct HandoffSender {
    tx: oneshot::Sender<String>,
}

/// Reading half, consumed by the synthesis stage
#[derive(Debug)]
pub struct HandoffReceiver {
    rx: oneshot::Receiver<String>,
}

/// Create a connected hand-off slot
pub fn handoff() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = oneshot::channel();
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl HandoffSender {
    /// Transfer the frozen reasoning text to the synthesis stage
    pub fn deliver(self, reasoning: String) {
        let len = reasoning.len();
        if self.tx.send(reasoning).is_err() {
            // Synthesis side already gone (call cancelled)
            debug!(reasoning_len = len, "Hand-off receiver dropped, reasoning discarded");
        }
    }
}

impl HandoffReceiver {
    /// Wait for the reasoning text. A sender dropped without delivering
    /// (stage aborted) resolves to the empty sentinel rather than blocking.
    pub async fn receive(self) -> String {
        self.rx.await.unwrap_or_default()
    }
}

/// Reasoning text owned by the reasoning stage until it is frozen
#[derive(Debug, Default)]
pub struct ReasoningAccumulator {
    parts: Vec<String>,
}

impl ReasoningAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.parts.push(text.into());
    }

    /// Concatenate every part into the hand-off value
    pub fn freeze(self) -> String {
        self.parts.concat()
    }
}
