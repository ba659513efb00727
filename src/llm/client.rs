// Streaming Claude client for the narrative strategy.
//
// Sends one Messages API request with `stream: true` and forwards the
// Server-Sent Events as `LlmEvent`s over an mpsc channel. The narrative
// strategy collects the events into the full reply text.

use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::protocol::LlmEvent;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level streaming client for the Anthropic Messages API.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

/// What to do after processing one SSE message.
enum StreamStep {
    Continue,
    Done,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Send a message and stream the response as `LlmEvent`s over `tx`.
    ///
    /// The `generation` counter is threaded through every emitted event so
    /// the receiver can discard events from a superseded request. Returns
    /// when the stream completes, errors, or the receiver is dropped.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "No API key configured".to_string(),
                    generation,
                })
                .await;
            return Ok(());
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": true,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }]
        });

        let request = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = match request.eventsource() {
            Ok(es) => es,
            Err(e) => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: format!("Could not open event stream: {e}"),
                        generation,
                    })
                    .await;
                return Ok(());
            }
        };

        let mut state = StreamState::default();

        while let Some(event) = es.next().await {
            let step = match event {
                Ok(Event::Open) => {
                    debug!("event stream open");
                    StreamStep::Continue
                }
                Ok(Event::Message(msg)) => {
                    state
                        .process(msg.event.as_str(), &msg.data, &tx, generation)
                        .await
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    let _ = tx
                        .send(LlmEvent::Error {
                            message: describe_stream_error(&err),
                            generation,
                        })
                        .await;
                    StreamStep::Done
                }
            };
            if matches!(step, StreamStep::Done) {
                es.close();
                return Ok(());
            }
        }

        // The server hung up before message_stop.
        state.finish(&tx, generation).await;
        drop(es);
        Ok(())
    }
}

/// Accumulated state of one in-flight stream.
#[derive(Default)]
struct StreamState {
    full_text: String,
    input_tokens: u32,
    output_tokens: u32,
}

impl StreamState {
    async fn process(
        &mut self,
        event_type: &str,
        data: &str,
        tx: &mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> StreamStep {
        match event_type {
            "message_start" => {
                match parse_input_tokens(data) {
                    Some(n) => self.input_tokens = n,
                    None => warn!("failed to parse input_tokens from message_start"),
                }
                StreamStep::Continue
            }
            "content_block_delta" => {
                if let Some(text) = parse_delta_text(data) {
                    self.full_text.push_str(&text);
                    if tx
                        .send(LlmEvent::Token { text, generation })
                        .await
                        .is_err()
                    {
                        // Receiver dropped; abort the stream.
                        return StreamStep::Done;
                    }
                }
                StreamStep::Continue
            }
            "message_delta" => {
                match parse_output_tokens(data) {
                    Some(n) => self.output_tokens = n,
                    None => warn!("failed to parse output_tokens from message_delta"),
                }
                StreamStep::Continue
            }
            "message_stop" => {
                debug!(
                    input_tokens = self.input_tokens,
                    output_tokens = self.output_tokens,
                    "streaming complete"
                );
                let _ = tx
                    .send(LlmEvent::Complete {
                        full_text: std::mem::take(&mut self.full_text),
                        input_tokens: self.input_tokens,
                        output_tokens: self.output_tokens,
                        generation,
                    })
                    .await;
                StreamStep::Done
            }
            // ping, content_block_start, content_block_stop: nothing to do.
            other => {
                debug!(event_type = other, "ignoring SSE event");
                StreamStep::Continue
            }
        }
    }

    /// Emit the terminal event for a stream that ended without
    /// `message_stop`.
    async fn finish(self, tx: &mpsc::Sender<LlmEvent>, generation: u64) {
        if self.full_text.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "Stream closed before any content arrived".to_string(),
                    generation,
                })
                .await;
        } else {
            let _ = tx
                .send(LlmEvent::Complete {
                    full_text: self.full_text,
                    input_tokens: self.input_tokens,
                    output_tokens: self.output_tokens,
                    generation,
                })
                .await;
        }
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either an active Claude client or disabled
/// (no API key configured).
pub enum LlmClient {
    Active(ClaudeClient),
    Disabled,
}

impl LlmClient {
    /// Build an `LlmClient` from the application config. `Active` when an
    /// API key is present in credentials, otherwise `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => {
                LlmClient::Active(ClaudeClient::new(key.clone(), config.llm.model.clone()))
            }
            _ => LlmClient::Disabled,
        }
    }

    /// Stream a message, delegating to the inner client or immediately
    /// sending an error if disabled.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        match self {
            LlmClient::Active(client) => {
                client
                    .stream_message(system, user_content, max_tokens, tx, generation)
                    .await
            }
            LlmClient::Disabled => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: "Reasoning service not configured".to_string(),
                        generation,
                    })
                    .await;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SSE payload shapes
// ---------------------------------------------------------------------------

// Only the fields the engine needs are modeled; serde skips the rest of the
// Messages API payloads.

#[derive(Deserialize)]
struct MessageStartEvent {
    message: MessageStartBody,
}

#[derive(Deserialize)]
struct MessageStartBody {
    usage: InputUsage,
}

#[derive(Deserialize)]
struct InputUsage {
    input_tokens: u32,
}

#[derive(Deserialize)]
struct ContentBlockDeltaEvent {
    delta: BlockDelta,
}

#[derive(Deserialize)]
struct BlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessageDeltaEvent {
    usage: OutputUsage,
}

#[derive(Deserialize)]
struct OutputUsage {
    output_tokens: u32,
}

/// `input_tokens` from a `message_start` payload.
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    serde_json::from_str::<MessageStartEvent>(data)
        .ok()
        .map(|e| e.message.usage.input_tokens)
}

/// `delta.text` from a `content_block_delta` payload. `None` for non-text
/// deltas.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    serde_json::from_str::<ContentBlockDeltaEvent>(data)
        .ok()
        .and_then(|e| e.delta.text)
}

/// `output_tokens` from a `message_delta` payload.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    serde_json::from_str::<MessageDeltaEvent>(data)
        .ok()
        .map(|e| e.usage.output_tokens)
}

/// Human-readable message for an SSE error.
fn describe_stream_error(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::Transport(e) => {
            format!("Network error: {e}")
        }
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
