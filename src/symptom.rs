//! RAG symptom checker
//!
//! Answers free-text health questions with a tool-calling agent grounded in
//! a local CSV knowledge base, falling back to web search. Each session keeps
//! a short rolling chat history.

pub mod agent;
pub mod knowledge;
mod prompt;

pub use agent::{AgentError, SymptomAgent};
pub use knowledge::KnowledgeBase;

use crate::store::{ChatHistoryStore, ChatTurn};
use std::sync::Arc;

pub const AGENT_UNAVAILABLE: &str = "Error: The AI agent is not available. Please contact support.";
pub const PROCESSING_FAILED: &str = "An error occurred while processing your request.";

pub struct SymptomChecker {
    agent: Option<SymptomAgent>,
    history: Arc<dyn ChatHistoryStore>,
}

impl SymptomChecker {
    pub fn new(agent: Option<SymptomAgent>, history: Arc<dyn ChatHistoryStore>) -> Self {
        Self { agent, history }
    }

    pub fn is_available(&self) -> bool {
        self.agent.is_some()
    }

    /// Answer one query; always produces user-facing text
    pub async fn respond(&self, session_id: &str, query: &str) -> String {
        let Some(agent) = &self.agent else {
            tracing::error!(session_id = %session_id, "Symptom query received but no agent is configured");
            return AGENT_UNAVAILABLE.to_string();
        };

        let history = match self.history.load_history(session_id).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to load chat history");
                Vec::new()
            }
        };

        match agent.answer(query, &history).await {
            Ok(answer) => {
                let turn = ChatTurn::new(query, answer.clone());
                if let Err(e) = self.history.append_turn(session_id, turn).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Failed to save chat history");
                }
                tracing::info!(session_id = %session_id, history_turns = history.len(), "Symptom query answered");
                answer
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Symptom agent failed");
                PROCESSING_FAILED.to_string()
            }
        }
    }
}
