// src/server/handlers.rs
// Route handlers

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde_json::{Value, json};
use std::convert::Infallible;
use tracing::{Instrument, info, info_span, warn};

use super::AppState;
use super::error::ApiResult;
use super::types::{ChatCompletionRequest, ModelList};
use crate::error::{RelayError, Result};
use crate::pipeline::RelayRequest;

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the reasoning relay API" }))
}

/// `GET /v1/models`
pub async fn list_models(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<ModelList>> {
    authorize(&state, &headers)?;
    Ok(Json(ModelList::relay()))
}

/// `POST /v1/chat/completions`
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatCompletionRequest>,
) -> ApiResult<Response> {
    authorize(&state, &headers)?;
    body.validate(&state.config.claude_model)?;

    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("chat_completions", %request_id, stream = body.stream);

    let request = RelayRequest::new(
        body.messages.clone(),
        state.config.reasoning_model.as_str(),
        state.config.claude_model.as_str(),
    )
    .with_args(body.model_args());

    if body.stream {
        // Stage spans nest under the request span they are created in
        let frames = span
            .in_scope(|| {
                info!(messages = request.messages.len(), "Streaming relay request");
                state.pipeline.stream_frames(request)
            })
            .map(Ok::<_, Infallible>);

        let headers = [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ];
        return Ok((headers, Body::from_stream(frames)).into_response());
    }

    async move {
        info!(messages = request.messages.len(), "Relay request");
        let completion = state.pipeline.complete(request).await?;
        Ok(Json(completion).into_response())
    }
    .instrument(span)
    .await
}

/// Check the caller's bearer key when one is configured
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    if !state.config.requires_api_key() {
        return Ok(());
    }

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(key) if key == state.config.allow_api_key => Ok(()),
        Some(_) => {
            warn!("Rejected request with invalid API key");
            Err(RelayError::Unauthorized("invalid API key".to_string()))
        }
        None => {
            warn!("Rejected request without API key");
            Err(RelayError::Unauthorized("missing API key".to_string()))
        }
    }
}
