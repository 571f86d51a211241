//! `google_search` tool: Google Custom Search JSON API

use super::{parse_query, query_schema, Tool, ToolOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const RESULT_COUNT: u8 = 4;
pub const NO_RESULTS: &str = "No good Google Search Result was found";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

/// Google Custom Search client
pub struct GoogleSearch {
    client: Client,
    api_key: String,
    engine_id: String,
}

impl GoogleSearch {
    pub fn new(api_key: String, engine_id: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            engine_id,
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, String> {
        let num = RESULT_COUNT.to_string();
        let response = self
            .client
            .get(CSE_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {body}"));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid response: {e}"))?;
        Ok(parsed.items)
    }
}

/// Render results as `title\nlink\nsnippet` blocks
pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    results
        .iter()
        .map(|r| format!("{}\n{}\n{}", r.title.trim(), r.link.trim(), r.snippet.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct WebSearchTool {
    search: GoogleSearch,
}

impl WebSearchTool {
    pub fn new(search: GoogleSearch) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "google_search"
    }

    fn description(&self) -> String {
        "Use this tool to search the internet for up-to-date information. It is a fallback to be used only if the local_knowledge_base does not contain a relevant answer.".to_string()
    }

    fn input_schema(&self) -> Value {
        query_schema("The web search query")
    }

    async fn run(&self, input: Value) -> ToolOutput {
        let query = match parse_query(input) {
            Ok(q) => q,
            Err(out) => return out,
        };

        match self.search.search(&query).await {
            Ok(results) => {
                tracing::debug!(query = %query, results = results.len(), "Web search");
                ToolOutput::success(render_results(&results))
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Web search failed");
                ToolOutput::error(format!("Google search failed: {e}"))
            }
        }
    }
}
