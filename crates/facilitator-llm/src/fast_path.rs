use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::types::{ChatRequest, ChatResponse, ToolCall};

/// Fast tool-calling path: used by the Tangent Assessor and Item Summariser,
/// both of which force a single structured tool call and need a response in
/// low single-digit seconds.
#[async_trait]
pub trait FastPathLlm: Send + Sync {
    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client for the fast path, forcing the single tool
/// present on the request via `tool_choice`.
///
/// Grounded on `skynet-agent::anthropic::AnthropicProvider` — same header
/// scheme, same JSON body shape — trimmed to the single non-streaming call
/// this path needs.
pub struct AnthropicFastPath {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicFastPath {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".to_string()),
        }
    }
}

#[async_trait]
impl FastPathLlm for AnthropicFastPath {
    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let tool = request.tools.first().ok_or_else(|| {
            LlmError::Malformed("fast path call requires exactly one tool definition".to_string())
        })?;

        let body = serde_json::json!({
            "model": request.model,
            "system": request.system,
            "max_tokens": request.max_tokens,
            "messages": request.messages.iter().map(|m| serde_json::json!({
                "role": crate::types::role_str(m.role),
                "content": m.content,
            })).collect::<Vec<_>>(),
            "tools": [{
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            }],
            "tool_choice": { "type": "tool", "name": tool.name },
        });

        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %request.model, tool = %tool.name, "fast path LM call");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "fast path LM error response");
            return Err(LlmError::Api(text));
        }

        let api_resp: ApiResponse =
            resp.json().await.map_err(|e| LlmError::Malformed(e.to_string()))?;

        let mut content = String::new();
        let mut tool_call = None;
        for block in api_resp.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { name, input, .. } => {
                    tool_call = Some(ToolCall { name, input });
                }
            }
        }

        Ok(ChatResponse { content, tool_call })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse {
        #[allow(dead_code)]
        id: String,
        name: String,
        input: serde_json::Value,
    },
}
