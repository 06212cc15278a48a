/// AI module for Opener
///
/// Everything needed to talk to the hosted LLM: the request/reply types the
/// rest of the crate uses, the [`ChatBackend`] seam, and the Gemini client.
///
/// # Architecture
///
/// - `client` - error types, instructions, request/reply types and the backend trait
/// - `gemini` - reqwest client for the Vertex AI `generateContent` endpoint
///
/// # Usage
///
/// ```rust,no_run
/// use opener::ai::{ChatBackend, GeminiClient, LlmRequest};
/// use std::time::Duration;
///
/// # async fn example() -> opener::ai::ChatResult<()> {
/// let client = GeminiClient::new(
///     opener::ai::gemini::DEFAULT_ENDPOINT.to_string(),
///     "api-key".to_string(),
///     Duration::from_secs(30),
/// )?;
/// let reply = client
///     .generate(LlmRequest {
///         message: "안녕".to_string(),
///         ..Default::default()
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
mod client;
pub mod gemini;

// Re-export main types
pub use client::{
    ANSWER_RULES, ChatBackend, ChatError, ChatResult, IMAGE_ANALYSIS_INSTRUCTION, InlineImage,
    LlmReply, LlmRequest, Source, history_window, unsupported_app_instruction,
};
pub use gemini::GeminiClient;
