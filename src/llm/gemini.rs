//! Google Gemini provider implementation

use super::types::{ContentBlock, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
    temperature: Option<f32>,
}

impl GeminiService {
    pub fn new(api_key: String, model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            url: format!("{GEMINI_API_BASE}/models/{model}:generateContent"),
            model_id: model.to_string(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn translate_request(&self, request: &LlmRequest) -> GeminiRequest {
        let system_instruction = request.system.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text { text: text.clone() }],
        });

        let mut contents = Vec::new();
        for msg in &request.messages {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };

            let parts: Vec<GeminiPart> = msg
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => GeminiPart::Text { text: text.clone() },
                    ContentBlock::ToolUse { name, input, .. } => GeminiPart::FunctionCall {
                        function_call: GeminiFunctionCall {
                            name: name.clone(),
                            args: input.clone(),
                        },
                    },
                    ContentBlock::ToolResult {
                        name,
                        content,
                        is_error,
                        ..
                    } => GeminiPart::FunctionResponse {
                        function_response: GeminiFunctionResponse {
                            name: name.clone(),
                            response: serde_json::json!({
                                "result": content,
                                "error": is_error
                            }),
                        },
                    },
                })
                .collect();

            if !parts.is_empty() {
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                });
            }
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: self.temperature,
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

        let mut content = Vec::new();
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for (index, part) in parts.into_iter().enumerate() {
            match part {
                GeminiPart::Text { text } => {
                    if !text.is_empty() {
                        content.push(ContentBlock::Text { text });
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    // Gemini does not assign call IDs
                    content.push(ContentBlock::ToolUse {
                        id: format!("call_{index}_{}", function_call.name),
                        name: function_call.name,
                        input: function_call.args,
                    });
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => {}
            }
        }

        let end_turn = candidate.finish_reason.is_some_and(|r| r == "STOP");
        let usage = resp.usage_metadata.unwrap_or_default();

        Ok(LlmResponse {
            content,
            end_turn,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Part types this client does not use
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GeminiUsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmMessage, ToolDefinition};
    use serde_json::json;

    fn service() -> GeminiService {
        GeminiService::new("test-key".to_string(), "gemini-1.5-flash").with_temperature(0.2)
    }

    #[test]
    fn test_translate_request_roles_and_tools() {
        let request = LlmRequest {
            system: Some("You are a symptom checker.".to_string()),
            messages: vec![
                LlmMessage::user(vec![ContentBlock::text("I have a fever")]),
                LlmMessage::assistant(vec![ContentBlock::tool_use(
                    "call_0_local_knowledge_base",
                    "local_knowledge_base",
                    json!({"query": "fever"}),
                )]),
                LlmMessage::user(vec![ContentBlock::tool_result(
                    "call_0_local_knowledge_base",
                    "local_knowledge_base",
                    "Fever: rest and fluids",
                    false,
                )]),
            ],
            tools: vec![ToolDefinition {
                name: "local_knowledge_base".to_string(),
                description: "Search".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            max_tokens: Some(512),
        };

        let value = serde_json::to_value(service().translate_request(&request)).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "You are a symptom checker.");
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(
            value["contents"][1]["parts"][0]["functionCall"]["name"],
            "local_knowledge_base"
        );
        assert_eq!(
            value["contents"][2]["parts"][0]["functionResponse"]["name"],
            "local_knowledge_base"
        );
        assert_eq!(
            value["contents"][2]["parts"][0]["functionResponse"]["response"]["result"],
            "Fever: rest and fluids"
        );
        assert_eq!(
            value["tools"][0]["functionDeclarations"][0]["name"],
            "local_knowledge_base"
        );
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 512);
        let temperature = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_function_call_response() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Let me check."},
                        {"functionCall": {"name": "google_search", "args": {"query": "dengue"}}},
                        {"inlineData": {"mimeType": "image/png", "data": ""}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4, "totalTokenCount": 14}
        });
        let resp: GeminiResponse = serde_json::from_value(body).unwrap();
        let normalized = GeminiService::normalize_response(resp).unwrap();
        assert_eq!(normalized.text(), "Let me check.");
        let calls = normalized.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1_google_search");
        assert_eq!(calls[0].input["query"], "dengue");
        assert!(normalized.end_turn);
        assert_eq!(normalized.usage.input_tokens, 10);
    }

    #[test]
    fn test_normalize_without_candidates_fails() {
        let resp: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(GeminiService::normalize_response(resp).is_err());
    }
}
