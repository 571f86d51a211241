//! Tools the symptom agent can call

mod knowledge_search;
mod web_search;

pub use knowledge_search::KnowledgeSearchTool;
pub use web_search::{GoogleSearch, WebSearchTool};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn run(&self, input: Value) -> ToolOutput;
}

/// Collection of tools available to the agent
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        self.tools
            .iter()
            .map(|t| crate::llm::ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name; `None` if no tool has that name
    pub async fn execute(&self, name: &str, input: Value) -> Option<ToolOutput> {
        for tool in &self.tools {
            if tool.name() == name {
                return Some(tool.run(input).await);
            }
        }
        None
    }
}

/// Input shared by both search tools
#[derive(Debug, Deserialize)]
struct QueryInput {
    query: String,
}

fn query_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["query"],
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        }
    })
}

fn parse_query(input: Value) -> Result<String, ToolOutput> {
    match serde_json::from_value::<QueryInput>(input) {
        Ok(q) if !q.query.trim().is_empty() => Ok(q.query),
        Ok(_) => Err(ToolOutput::error("query must not be empty")),
        Err(e) => Err(ToolOutput::error(format!("Invalid input: {e}"))),
    }
}
