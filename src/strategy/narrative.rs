// LLM-backed recommendation strategy.
//
// Composes the structured analysis prompt, streams the reply from the
// reasoning service, and parses the single JSON object it must contain.
// Malformed replies are a hard error: a recommendation that failed schema
// validation must never reach storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::AdvisorError;
use crate::llm::client::LlmClient;
use crate::llm::prompt;
use crate::model::{EventCategory, Recommendation};
use crate::protocol::LlmEvent;
use crate::store::ReasoningStore;
use crate::strategy::{AnalysisContext, RecommendationStrategy};

/// Channel capacity for the token stream.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Strategy that delegates the weekly decision to the external reasoning
/// service. Input/output contract is identical to the heuristic strategy.
pub struct NarrativeStrategy {
    client: Arc<LlmClient>,
    max_tokens: u32,
    timeout: Duration,
}

impl NarrativeStrategy {
    pub fn new(client: Arc<LlmClient>, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            client,
            max_tokens,
            timeout,
        }
    }

    pub fn from_config(config: &Config, client: Arc<LlmClient>) -> Self {
        Self::new(
            client,
            config.llm.max_tokens,
            Duration::from_secs(config.llm.request_timeout_secs),
        )
    }

    /// Run the streaming call and collect the full reply text. Transport
    /// failures and timeouts surface as `Upstream`.
    async fn fetch_reply(&self, system: &str, user: &str, generation: u64) -> Result<String, AdvisorError> {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let client = Arc::clone(&self.client);
        let system = system.to_string();
        let user = user.to_string();
        let max_tokens = self.max_tokens;
        let call = tokio::spawn(async move {
            let _ = client
                .stream_message(&system, &user, max_tokens, tx, generation)
                .await;
        });

        let collect = async {
            while let Some(event) = rx.recv().await {
                match event {
                    LlmEvent::Token { .. } => {}
                    LlmEvent::Complete {
                        full_text,
                        input_tokens,
                        output_tokens,
                        ..
                    } => {
                        debug!(input_tokens, output_tokens, "reasoning service reply complete");
                        return Ok(full_text);
                    }
                    LlmEvent::Error { message, .. } => {
                        return Err(AdvisorError::Upstream(message));
                    }
                }
            }
            Err(AdvisorError::Upstream(
                "stream closed without completing".to_string(),
            ))
        };

        let outcome = match tokio::time::timeout(self.timeout, collect).await {
            Ok(result) => result,
            Err(_) => Err(AdvisorError::Upstream(format!(
                "reasoning service call timed out after {}s",
                self.timeout.as_secs()
            ))),
        };

        // Dropping the receiver is enough to stop the sender; the task is
        // aborted as well so a hung connection cannot linger.
        call.abort();
        outcome
    }

    /// Parse the reply into a validated `Recommendation`.
    fn parse_reply(reply: &str) -> Result<Recommendation, AdvisorError> {
        let json = extract_json_object(reply).ok_or_else(|| {
            AdvisorError::Parse("reply contains no JSON object".to_string())
        })?;

        let recommendation: Recommendation = serde_json::from_str(json)
            .map_err(|e| AdvisorError::Parse(format!("reply JSON does not match schema: {e}")))?;

        recommendation.validate().map_err(AdvisorError::Parse)?;
        Ok(recommendation)
    }
}

#[async_trait]
impl RecommendationStrategy for NarrativeStrategy {
    async fn recommend(
        &self,
        ctx: &AnalysisContext,
        log: &dyn ReasoningStore,
    ) -> Result<Recommendation, AdvisorError> {
        let gw = ctx.gameweek;

        log.append(
            Some(gw),
            "Consulting the reasoning service for a full squad review...",
            EventCategory::Thinking,
        )?;

        let system = prompt::system_prompt();
        let user = prompt::build_analysis_prompt(ctx);
        let reply = self.fetch_reply(&system, &user, gw as u64).await?;

        info!(gameweek = gw, reply_len = reply.len(), "parsing reasoning service reply");
        Self::parse_reply(&reply)
    }
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Return the first balanced JSON object in `text`, scanning from the first
/// `{` and tracking string and escape state so braces inside string values
/// don't end the object early.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
