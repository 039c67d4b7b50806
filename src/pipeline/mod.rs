// src/pipeline/mod.rs
// Reasoning -> synthesis stream coordination

pub mod format;
pub mod handoff;
pub mod merger;
pub mod reasoning;
pub mod synthesis;

use futures::StreamExt;
use futures::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::llm::{
    AnswerSource, ClaudeClient, ClaudeProvider, DeepSeekClient, GeminiClient, Message, ModelArgs, ReasoningProvider,
    ReasoningSource, RegexTokenCounter, TiktokenCounter, TokenCounter,
};

pub use format::{ChatCompletion, DONE_FRAME, Session, Usage, encode_frame};
pub use merger::{Merged, OutputEnvelope};
pub use synthesis::REASONING_PLACEHOLDER;

/// One caller request, as the pipeline sees it
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub messages: Vec<Message>,
    pub args: ModelArgs,
    pub reasoning_model: String,
    pub synthesis_model: String,
}

impl RelayRequest {
    pub fn new(messages: Vec<Message>, reasoning_model: impl Into<String>, synthesis_model: impl Into<String>) -> Self {
        Self {
            messages,
            args: ModelArgs::default(),
            reasoning_model: reasoning_model.into(),
            synthesis_model: synthesis_model.into(),
        }
    }

    pub fn with_args(mut self, args: ModelArgs) -> Self {
        self.args = args;
        self
    }
}

/// Two-stage relay: a reasoning provider's chain-of-thought feeds a
/// synthesis provider, and both are merged into one response.
#[derive(Clone)]
pub struct RelayPipeline {
    reasoning: Arc<dyn ReasoningSource>,
    synthesis: Arc<dyn AnswerSource>,
    origin_reasoning: bool,
    tokens: Arc<dyn TokenCounter>,
}

impl RelayPipeline {
    pub fn new(reasoning: Arc<dyn ReasoningSource>, synthesis: Arc<dyn AnswerSource>, origin_reasoning: bool) -> Self {
        Self {
            reasoning,
            synthesis,
            origin_reasoning,
            tokens: Arc::new(RegexTokenCounter::new()),
        }
    }

    /// Swap the counter used for non-streaming usage figures
    pub fn with_token_counter(mut self, tokens: Arc<dyn TokenCounter>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Build the concrete providers. Unsupported selectors fail here,
    /// before any request is made.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let reasoning_provider: ReasoningProvider = config.reasoning_provider.parse()?;
        let claude_provider: ClaudeProvider = config.claude_provider.parse()?;

        if config.reasoning_api_key.is_empty() {
            warn!(provider = %reasoning_provider, "Reasoning API key not set");
        }
        if config.claude_api_key.is_empty() {
            warn!(provider = %claude_provider, "Claude API key not set");
        }

        let key = config.reasoning_api_key.clone();
        let url = config.reasoning_api_url.clone();
        let (reasoning, reasoning_url, origin_reasoning): (Arc<dyn ReasoningSource>, String, bool) =
            match reasoning_provider {
                ReasoningProvider::DeepSeek => {
                    let client = DeepSeekClient::new(key, url);
                    let url = client.api_url().to_string();
                    (Arc::new(client), url, config.origin_reasoning)
                }
                // Gemini's endpoint has no reasoning field of its own
                ReasoningProvider::Gemini => {
                    let client = GeminiClient::new(key, url);
                    let url = client.api_url().to_string();
                    (Arc::new(client), url, false)
                }
            };

        let synthesis = Arc::new(ClaudeClient::new(
            config.claude_api_key.clone(),
            config.claude_api_url.clone(),
            claude_provider,
        )?);

        info!(
            reasoning = %reasoning_provider,
            reasoning_url = %reasoning_url,
            synthesis = %claude_provider,
            synthesis_url = %synthesis.api_url(),
            origin_reasoning,
            "Relay pipeline configured"
        );

        let tokens: Arc<dyn TokenCounter> = match TiktokenCounter::o200k() {
            Ok(counter) => Arc::new(counter),
            Err(e) => {
                warn!(error = %e, "Falling back to estimated token counts");
                Arc::new(RegexTokenCounter::new())
            }
        };

        Ok(Self::new(reasoning, synthesis, origin_reasoning).with_token_counter(tokens))
    }

    pub fn origin_reasoning(&self) -> bool {
        self.origin_reasoning
    }

    /// Run both stages concurrently and yield their merged output, ending
    /// with exactly one `Merged::End`.
    ///
    /// Stages start on first poll. Dropping the stream cancels them and
    /// releases their upstream connections. Stage spans are parented to the
    /// span current at call time, not at first poll.
    pub fn stream_merged(&self, request: RelayRequest) -> BoxStream<'static, Merged> {
        let reasoning = self.reasoning.clone();
        let synthesis = self.synthesis.clone();
        let origin_reasoning = self.origin_reasoning;
        let parent = Span::current();

        Box::pin(async_stream::stream! {
            let session = Session::new();
            let token = CancellationToken::new();
            let _cancel_on_drop = token.clone().drop_guard();

            let (tx, rx) = merger::intake();
            let (handoff_tx, handoff_rx) = handoff::handoff();
            let reasoning_out = merger::StageOutput::new(
                tx.clone(),
                session.clone(),
                request.reasoning_model.as_str(),
                "reasoning",
            );
            let synthesis_out = merger::StageOutput::new(tx, session.clone(), request.synthesis_model.as_str(), "synthesis");

            spawn_stage(
                token.clone(),
                info_span!(parent: &parent, "reasoning_stage", session_id = %session.id),
                reasoning::run_reasoning_stage(
                    reasoning,
                    request.messages.clone(),
                    request.reasoning_model,
                    origin_reasoning,
                    reasoning_out,
                    handoff_tx,
                ),
            );
            spawn_stage(
                token.clone(),
                info_span!(parent: &parent, "synthesis_stage", session_id = %session.id),
                synthesis::run_synthesis_stage(
                    synthesis,
                    request.messages,
                    request.synthesis_model,
                    request.args,
                    handoff_rx,
                    synthesis_out,
                ),
            );

            let mut merged = merger::merge(rx);
            while let Some(item) = merged.next().await {
                yield item;
            }
        })
    }

    /// Streaming wire output: one `data:` frame per chunk, then `[DONE]`
    pub fn stream_frames(&self, request: RelayRequest) -> BoxStream<'static, String> {
        self.stream_merged(request)
            .map(|item| match item {
                Merged::Envelope(envelope) => encode_frame(&envelope),
                Merged::End => DONE_FRAME.to_string(),
            })
            .boxed()
    }

    /// Non-streaming: reasoning to completion, then synthesis to completion
    ///
    /// A reasoning failure degrades to the placeholder, which is also
    /// reported as the completion's `reasoning_content`. A synthesis
    /// failure is returned, since there is no partial answer to fall back on.
    pub async fn complete(&self, request: RelayRequest) -> Result<ChatCompletion> {
        let session = Session::new();
        let span = info_span!("relay_complete", session_id = %session.id);

        async move {
            let reasoning = match reasoning::drive(
                self.reasoning.as_ref(),
                request.messages.clone(),
                &request.reasoning_model,
                self.origin_reasoning,
                None,
            )
            .await
            {
                Ok(reasoning) => reasoning,
                Err(e) => {
                    error!(provider = self.reasoning.provider(), error = %e, "Reasoning request failed");
                    REASONING_PLACEHOLDER.to_string()
                }
            };
            info!(reasoning_len = reasoning.len(), "Reasoning collected");

            let prompt = synthesis::build_synthesis_messages(
                &request.messages,
                &synthesis::resolve_reasoning(reasoning.clone()),
            );
            let prompt_text = prompt.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
            let prompt_tokens = self.tokens.count(&prompt_text);

            let answer = synthesis::collect_answer(self.synthesis.as_ref(), prompt, &request.synthesis_model, request.args)
                .await
                .inspect_err(|e| error!(provider = self.synthesis.provider(), error = %e, "Synthesis request failed"))?;
            let completion_tokens = self.tokens.count(&answer);

            debug!(prompt_tokens, completion_tokens, "Token usage");

            Ok(ChatCompletion::new(
                &session,
                &request.synthesis_model,
                reasoning,
                answer,
                Usage::new(prompt_tokens, completion_tokens),
            ))
        }
        .instrument(span)
        .await
    }
}

/// Spawn a stage task that stops as soon as `token` is cancelled
fn spawn_stage<F>(token: CancellationToken, span: Span, stage: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(
        async move {
            tokio::select! {
                _ = token.cancelled() => debug!("Stage cancelled"),
                _ = stage => {}
            }
        }
        .instrument(span),
    );
}
