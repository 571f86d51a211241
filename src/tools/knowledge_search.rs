//! `local_knowledge_base` tool: retrieval over the CSV knowledge base

use super::{parse_query, query_schema, Tool, ToolOutput};
use crate::symptom::knowledge::{KnowledgeBase, TOP_K};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct KnowledgeSearchTool {
    knowledge: Arc<KnowledgeBase>,
}

impl KnowledgeSearchTool {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &'static str {
        "local_knowledge_base"
    }

    fn description(&self) -> String {
        "Searches and returns documents about information present in the local CSV files."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        query_schema("What to look up in the local knowledge base")
    }

    async fn run(&self, input: Value) -> ToolOutput {
        let query = match parse_query(input) {
            Ok(q) => q,
            Err(out) => return out,
        };

        match self.knowledge.search(&query, TOP_K).await {
            Ok(hits) if hits.is_empty() => {
                ToolOutput::success("No relevant documents found in the local knowledge base.")
            }
            Ok(hits) => {
                tracing::debug!(query = %query, hits = hits.len(), "Knowledge search");
                let body = hits
                    .iter()
                    .map(|hit| format!("[source: {} row {}]\n{}", hit.chunk.source, hit.chunk.row, hit.chunk.text))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                ToolOutput::success(body)
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Knowledge search failed");
                ToolOutput::error(format!("Knowledge base search failed: {e}"))
            }
        }
    }
}
