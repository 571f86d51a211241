//! Text embedding providers

use super::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Largest batch the embedding endpoint accepts in one call
const MAX_BATCH: usize = 100;

/// What the vectors will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Document,
    Query,
}

impl EmbeddingTask {
    fn as_api_str(self) -> &'static str {
        match self {
            EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingTask::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Turns text into fixed-length vectors
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String], task: EmbeddingTask)
        -> Result<Vec<Vec<f32>>, LlmError>;

    fn model_id(&self) -> &str;
}

/// Gemini `batchEmbedContents` client
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model_id: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model_id: model.to_string(),
        }
    }

    fn batch_request<'a>(&self, texts: &'a [String], task: EmbeddingTask) -> BatchRequest<'a> {
        let model = format!("models/{}", self.model_id);
        BatchRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model.clone(),
                    content: EmbedContent {
                        parts: vec![EmbedPart { text }],
                    },
                    task_type: task.as_api_str(),
                })
                .collect(),
        }
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!(
            "{GEMINI_API_BASE}/models/{}:batchEmbedContents",
            self.model_id
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.batch_request(texts, task))
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        let parsed: BatchResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse embeddings: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(LlmError::unknown(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl EmbeddingService for GeminiEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            vectors.extend(self.embed_batch(batch, task).await?);
        }
        Ok(vectors)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
