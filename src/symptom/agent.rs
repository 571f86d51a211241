//! Tool-calling agent loop

use super::prompt::SYSTEM_PROMPT;
use crate::llm::{ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService};
use crate::store::ChatTurn;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use thiserror::Error;

pub const MAX_ITERATIONS: usize = 8;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("no answer after {0} iterations")]
    IterationLimit(usize),
    #[error("model returned an empty answer")]
    EmptyAnswer,
}

pub struct SymptomAgent {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
}

impl SymptomAgent {
    /// `None` when there are no tools to ground answers in
    pub fn new(llm: Arc<dyn LlmService>, tools: ToolRegistry) -> Option<Self> {
        if tools.is_empty() {
            return None;
        }
        Some(Self { llm, tools })
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Answer `query` given earlier turns of the same session
    pub async fn answer(&self, query: &str, history: &[ChatTurn]) -> Result<String, AgentError> {
        let mut messages = history_messages(history);
        messages.push(LlmMessage::user(vec![ContentBlock::text(query)]));
        let definitions = self.tools.definitions();

        for iteration in 1..=MAX_ITERATIONS {
            let request = LlmRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                messages: messages.clone(),
                tools: definitions.clone(),
                max_tokens: None,
            };
            let response = self.llm.complete(&request).await?;
            let calls = response.tool_calls();

            if calls.is_empty() {
                let text = response.text();
                if text.trim().is_empty() {
                    return Err(AgentError::EmptyAnswer);
                }
                tracing::debug!(iterations = iteration, "Agent answered");
                return Ok(text);
            }

            messages.push(LlmMessage::assistant(response.content.clone()));

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                tracing::info!(tool = %call.name, iteration, "Agent tool call");
                let block = match self.tools.execute(&call.name, call.input).await {
                    Some(output) => {
                        ContentBlock::tool_result(call.id, call.name, output.output, !output.success)
                    }
                    None => {
                        tracing::warn!(tool = %call.name, "Model requested unknown tool");
                        let message = format!("Unknown tool: {}", call.name);
                        ContentBlock::tool_result(call.id, call.name, message, true)
                    }
                };
                results.push(block);
            }
            messages.push(LlmMessage::user(results));
        }

        Err(AgentError::IterationLimit(MAX_ITERATIONS))
    }
}

fn history_messages(history: &[ChatTurn]) -> Vec<LlmMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2);
    for turn in history {
        if let Some(human) = turn.human.as_deref().filter(|s| !s.is_empty()) {
            messages.push(LlmMessage::user(vec![ContentBlock::text(human)]));
        }
        if let Some(ai) = turn.ai.as_deref().filter(|s| !s.is_empty()) {
            messages.push(LlmMessage::assistant(vec![ContentBlock::text(ai)]));
        }
    }
    messages
}
