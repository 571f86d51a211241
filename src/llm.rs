//! LLM provider abstraction
//!
//! Provides a common interface for chat completion and embedding providers.

mod embedding;
mod error;
mod gemini;
mod types;

pub use embedding::{EmbeddingService, EmbeddingTask, GeminiEmbedder};
pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    tool_calls = response.tool_calls().len(),
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// One-shot reachability check, logged but never fatal
pub async fn health_check(llm: &dyn LlmService) -> bool {
    tracing::info!(model = %llm.model_id(), "Performing LLM health check");
    match llm.complete(&LlmRequest::prompt("Hello, world!")).await {
        Ok(_) => {
            tracing::info!("LLM health check passed");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM health check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlmClient;

    #[tokio::test]
    async fn test_logging_service_passes_through() {
        let mock = Arc::new(MockLlmClient::new("mock-model"));
        mock.queue_text("hi there");
        mock.queue_error(LlmError::network("offline"));
        let logged = LoggingService::new(mock.clone());

        assert_eq!(logged.model_id(), "mock-model");
        let ok = logged.complete(&LlmRequest::prompt("hello")).await.unwrap();
        assert_eq!(ok.text(), "hi there");
        let err = logged.complete(&LlmRequest::prompt("hello")).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Network);
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_health_check() {
        let mock = MockLlmClient::new("mock-model");
        mock.queue_text("Hello!");
        assert!(health_check(&mock).await);
        // Nothing queued: the mock answers with a network error
        assert!(!health_check(&mock).await);
    }
}
