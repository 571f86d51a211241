//! Mock implementations for testing
//!
//! These mocks enable testing the conversation flows without real I/O.

use crate::db::Database;
use crate::llm::{
    ContentBlock, EmbeddingService, EmbeddingTask, LlmError, LlmRequest, LlmResponse, LlmService,
    Usage,
};
use crate::sms::state::{LookupQuery, Session};
use crate::store::{
    CatalogStore, ChatHistoryStore, ChatTurn, MedicineVariant, PharmacyStockRecord, SessionStore,
    StoreError, StoreResult,
};
use crate::tools::{Tool, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a final text answer
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::text(text)],
            end_turn: true,
            usage: Usage::default(),
        });
    }

    /// Queue a response asking for one tool call
    pub fn queue_tool_call(&self, name: &str, input: Value) {
        let n = self.responses.lock().unwrap().len();
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use(format!("call_{n}_{name}"), name, input)],
            end_turn: false,
            usage: Usage::default(),
        });
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Embedder
// ============================================================================

const MOCK_DIMENSIONS: usize = 256;

/// Deterministic bag-of-words embedder: each lowercase word bumps one bucket
#[derive(Default)]
pub struct MockEmbedder {
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            // FNV-1a
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            let bucket = usize::try_from(hash).map_or(0, |h| h % MOCK_DIMENSIONS);
            v[bucket] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_id(&self) -> &str {
        "mock-embedding"
    }
}

// ============================================================================
// Mock Tool
// ============================================================================

/// Tool that answers `"<name>: <query>"`
pub struct EchoTool {
    name: String,
}

impl EchoTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["query"],
            "properties": {"query": {"type": "string"}}
        })
    }

    async fn run(&self, input: Value) -> ToolOutput {
        match input.get("query").and_then(Value::as_str) {
            Some(q) => ToolOutput::success(format!("{}: {q}", self.name)),
            None => ToolOutput::error("missing query"),
        }
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Store whose every call fails as if the backend were down
pub struct FailingStore;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    })
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn get_session(&self, _phone: &str) -> StoreResult<Option<Session>> {
        unavailable()
    }

    async fn upsert_session(&self, _session: &Session) -> StoreResult<()> {
        unavailable()
    }

    async fn delete_session(&self, _phone: &str) -> StoreResult<()> {
        unavailable()
    }
}

#[async_trait]
impl CatalogStore for FailingStore {
    async fn find_variants(&self, _fragment: &str) -> StoreResult<Vec<MedicineVariant>> {
        unavailable()
    }

    async fn find_nearby(&self, _query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>> {
        unavailable()
    }
}

#[async_trait]
impl ChatHistoryStore for FailingStore {
    async fn load_history(&self, _session_id: &str) -> StoreResult<Vec<ChatTurn>> {
        unavailable()
    }

    async fn append_turn(&self, _session_id: &str, _turn: ChatTurn) -> StoreResult<()> {
        unavailable()
    }
}

/// Local store that cannot delete sessions; everything else works
pub struct DeleteFailingStore(pub Database);

#[async_trait]
impl SessionStore for DeleteFailingStore {
    async fn get_session(&self, phone: &str) -> StoreResult<Option<Session>> {
        SessionStore::get_session(&self.0, phone).await
    }

    async fn upsert_session(&self, session: &Session) -> StoreResult<()> {
        SessionStore::upsert_session(&self.0, session).await
    }

    async fn delete_session(&self, _phone: &str) -> StoreResult<()> {
        unavailable()
    }
}

#[async_trait]
impl CatalogStore for DeleteFailingStore {
    async fn find_variants(&self, fragment: &str) -> StoreResult<Vec<MedicineVariant>> {
        CatalogStore::find_variants(&self.0, fragment).await
    }

    async fn find_nearby(&self, query: &LookupQuery) -> StoreResult<Vec<PharmacyStockRecord>> {
        CatalogStore::find_nearby(&self.0, query).await
    }
}
