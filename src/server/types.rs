// src/server/types.rs
// Request and response bodies of the OpenAI-compatible surface

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::llm::{Message, ModelArgs};

/// Model id advertised by `/v1/models`
pub const RELAY_MODEL_ID: &str = "reasoning-relay";

fn default_stream() -> bool {
    true
}

fn default_temperature() -> f64 {
    ModelArgs::default().temperature
}

fn default_top_p() -> f64 {
    ModelArgs::default().top_p
}

/// `POST /v1/chat/completions` body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default)]
    pub presence_penalty: f64,
    #[serde(default)]
    pub frequency_penalty: f64,
}

impl ChatCompletionRequest {
    pub fn model_args(&self) -> ModelArgs {
        ModelArgs {
            temperature: self.temperature,
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
        }
    }

    /// Reject parameters the synthesis model cannot accept.
    /// `synthesis_model` is used when the request names no model.
    pub fn validate(&self, synthesis_model: &str) -> Result<()> {
        if self.messages.is_empty() {
            return Err(RelayError::InvalidRequest("messages must not be empty".into()));
        }

        let model = self.model.as_deref().unwrap_or(synthesis_model);
        if model.contains("sonnet") && !(0.0..=1.0).contains(&self.temperature) {
            return Err(RelayError::InvalidRequest(format!(
                "temperature must be between 0 and 1 for {}, got {}",
                model, self.temperature
            )));
        }

        Ok(())
    }
}

/// `GET /v1/models` body
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelList {
    pub fn relay() -> Self {
        Self {
            object: "list".to_string(),
            data: vec![ModelCard {
                id: RELAY_MODEL_ID.to_string(),
                object: "model".to_string(),
                created: chrono::Utc::now().timestamp(),
                owned_by: RELAY_MODEL_ID.to_string(),
            }],
        }
    }
}
