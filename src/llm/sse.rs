// src/llm/sse.rs
// Upstream server-sent-event plumbing shared by the provider adapters

use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::RequestBuilder;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use tracing::debug;

use crate::error::{RelayError, Result};

/// Open `request` as an SSE stream and yield each `data:` payload.
///
/// Ends on `[DONE]` or when the server closes the stream. A non-success
/// status becomes [`RelayError::Provider`] carrying the response body. The
/// event source never reconnects; an upstream failure ends the stream.
pub(crate) fn data_stream(request: RequestBuilder, provider: &'static str) -> BoxStream<'static, Result<String>> {
    Box::pin(async_stream::try_stream! {
        let mut es = EventSource::new(request)
            .map_err(|e| RelayError::Stream(format!("{} request not streamable: {}", provider, e)))?;
        es.set_retry_policy(Box::new(Never));

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!(provider, "upstream SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    if msg.data.trim() == "[DONE]" {
                        break;
                    }
                    yield msg.data;
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    es.close();
                    let body = response.text().await.unwrap_or_default();
                    Err::<(), _>(RelayError::Provider { provider, status: status.as_u16(), body })?;
                }
                Err(e) => {
                    es.close();
                    Err::<(), _>(RelayError::from(e))?;
                }
            }
        }

        es.close();
    })
}

/// Fail with [`RelayError::Provider`] unless the response status is a success
pub(crate) async fn check_status(response: reqwest::Response, provider: &'static str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Provider { provider, status: status.as_u16(), body })
}
