// Events emitted by the streaming LLM client.

/// One event from the reasoning-service stream.
///
/// The `generation` counter identifies the request that produced the event
/// so a consumer can discard events from a superseded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmEvent {
    /// A chunk of response text.
    Token { text: String, generation: u64 },
    /// The stream finished; `full_text` is the concatenation of all tokens.
    Complete {
        full_text: String,
        input_tokens: u32,
        output_tokens: u32,
        generation: u64,
    },
    /// The stream failed. Terminal for this generation.
    Error { message: String, generation: u64 },
}
