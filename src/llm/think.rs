//! Incremental `<think>...</think>` splitter
//!
//! Reasoning models without a native reasoning field wrap their
//! chain-of-thought in think tags inside ordinary content. Tags can be split
//! across stream deltas, so a possible partial tag at the end of the buffer
//! is held back until the next delta disambiguates it.

use super::Chunk;

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Nothing decisive seen yet
    Start,
    Thinking,
    Answering,
}

#[derive(Debug)]
pub struct ThinkSplitter {
    mode: Mode,
    buffer: String,
}

impl Default for ThinkSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkSplitter {
    pub fn new() -> Self {
        Self {
            mode: Mode::Start,
            buffer: String::new(),
        }
    }

    /// Feed one content delta, returning the chunks it resolves
    pub fn push(&mut self, text: &str) -> Vec<Chunk> {
        self.buffer.push_str(text);
        let mut out = Vec::new();

        loop {
            match self.mode {
                Mode::Start => {
                    let trimmed = self.buffer.trim_start();
                    if let Some(rest) = trimmed.strip_prefix(OPEN_TAG) {
                        self.buffer = rest.to_string();
                        self.mode = Mode::Thinking;
                    } else if OPEN_TAG.starts_with(trimmed) {
                        // Empty, whitespace, or a prefix of the open tag
                        return out;
                    } else {
                        self.mode = Mode::Answering;
                    }
                }
                Mode::Thinking => {
                    if let Some(idx) = self.buffer.find(CLOSE_TAG) {
                        let reasoning: String = self.buffer.drain(..idx).collect();
                        self.buffer.drain(..CLOSE_TAG.len());
                        if !reasoning.is_empty() {
                            out.push(Chunk::reasoning(reasoning));
                        }
                        self.mode = Mode::Answering;
                    } else {
                        let keep = partial_suffix_len(&self.buffer, CLOSE_TAG);
                        let emit = self.buffer.len() - keep;
                        if emit > 0 {
                            let reasoning: String = self.buffer.drain(..emit).collect();
                            out.push(Chunk::reasoning(reasoning));
                        }
                        return out;
                    }
                }
                Mode::Answering => {
                    if !self.buffer.is_empty() {
                        out.push(Chunk::answer(std::mem::take(&mut self.buffer)));
                    }
                    return out;
                }
            }
        }
    }

    /// Flush whatever is still held back once the upstream ends
    pub fn finish(&mut self) -> Vec<Chunk> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.is_empty() {
            return Vec::new();
        }

        match self.mode {
            Mode::Thinking => vec![Chunk::reasoning(rest)],
            Mode::Start | Mode::Answering => vec![Chunk::answer(rest)],
        }
    }
}

/// Length of the longest proper prefix of `tag` that `text` ends with
fn partial_suffix_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| text.ends_with(&tag[..n]))
        .unwrap_or(0)
}
