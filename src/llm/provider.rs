use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::PipelineError;

/// Seam between the assistant and the hosted model API. The ingestion
/// pipeline only uses `embed`; the chat path only uses `chat`. Tests plug
/// in deterministic fakes here.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, e.g. "openai".
    fn name(&self) -> &str;

    /// Chat completion (non-streaming). Returns the plain response text.
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, PipelineError>;

    /// Generate one embedding per input, preserving input order.
    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError>;
}
