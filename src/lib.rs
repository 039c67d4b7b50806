// src/lib.rs
//! Reasoning relay: streams a reasoning model's chain-of-thought into a
//! synthesis model and serves the combined output over an
//! OpenAI-compatible API.

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use pipeline::{RelayPipeline, RelayRequest};
