// src/llm/tokens.rs
// Token counts for the non-streaming `usage` block

use once_cell::sync::Lazy;
use regex::Regex;
use tiktoken_rs::CoreBPE;

use crate::error::{RelayError, Result};

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

// GPT-style pre-tokenization: contractions, words, numbers, punctuation runs, whitespace
static PIECE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[sdmt]|ll|ve|re)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+")
        .expect("valid regex")
});

/// BPE counts over the `o200k_base` vocabulary used by the gpt-4o family
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn o200k() -> Result<Self> {
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| RelayError::Config(format!("failed to load o200k_base vocabulary: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Fallback when the BPE vocabulary can't be loaded. Splits text into
/// pre-tokens and charges roughly one token per four chars of each piece
/// (at least one).
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexTokenCounter;

impl RegexTokenCounter {
    pub fn new() -> Self {
        Self
    }
}

impl TokenCounter for RegexTokenCounter {
    fn count(&self, text: &str) -> usize {
        PIECE_RE
            .find_iter(text)
            .map(|m| m.as_str().chars().count().div_ceil(4).max(1))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(RegexTokenCounter.count(""), 0);
    }

    #[test]
    fn test_short_words() {
        // "Hello" (2) | "," | " world" (2) | "!"
        assert_eq!(RegexTokenCounter.count("Hello, world!"), 6);
    }

    #[test]
    fn test_long_word_charged_by_length() {
        // 13 chars -> 4 tokens
        assert_eq!(RegexTokenCounter.count("extraordinary"), 4);
    }

    #[test]
    fn test_contraction_split() {
        // "don" | "'t"
        assert_eq!(RegexTokenCounter.count("don't"), 2);
    }

    #[test]
    fn test_o200k_counts() {
        let counter = TiktokenCounter::o200k().unwrap();
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("hello world"), 2);
        // "Hello" | "," | " world" | "!"
        assert_eq!(counter.count("Hello, world!"), 4);
    }

    #[test]
    fn test_deterministic() {
        let text = "Here's my original input:\n1+1\n\nBased on this reasoning";
        assert_eq!(RegexTokenCounter.count(text), RegexTokenCounter.count(text));
        assert!(RegexTokenCounter.count(text) > 0);
    }
}
