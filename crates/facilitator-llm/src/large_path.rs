use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::types::{ChatRequest, StreamEvent};

/// Large streaming chat path: freeform replies and Custom document prose.
/// No tools, no forced structure — just text deltas until `Done`.
#[async_trait]
pub trait LargePathLlm: Send + Sync {
    async fn stream(&self, request: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<()>;
}

const API_VERSION: &str = "2023-06-01";

/// Grounded on `skynet-agent::anthropic_stream::process_stream` — forwards
/// SSE `content_block_delta` events as `TextDelta`, trimmed to what the
/// Custom Document composer and freeform replies actually consume (no
/// thinking blocks, no tool-use events).
pub struct AnthropicLargePath {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicLargePath {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".to_string()),
        }
    }
}

#[async_trait]
impl LargePathLlm for AnthropicLargePath {
    async fn stream(&self, request: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<()> {
        let body = serde_json::json!({
            "model": request.model,
            "system": request.system,
            "max_tokens": request.max_tokens,
            "stream": true,
            "messages": request.messages.iter().map(|m| serde_json::json!({
                "role": crate::types::role_str(m.role),
                "content": m.content,
            })).collect::<Vec<_>>(),
        });

        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %request.model, "large path LM stream");

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
            warn!(status = status.as_u16(), body = %text, "large path LM error response");
            let _ = tx.send(StreamEvent::Error { message: text.clone() }).await;
            return Err(LlmError::Api(text));
        }

        let mut byte_stream = resp.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Transport(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let raw_event = buffer[..pos].to_string();
                buffer.drain(..pos + 2);
                forward_event(&raw_event, &tx).await;
            }
        }

        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }
}

async fn forward_event(raw_event: &str, tx: &mpsc::Sender<StreamEvent>) {
    for line in raw_event.lines() {
        let Some(data) = line.strip_prefix("data: ") else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else { continue };

        if value.get("type").and_then(|t| t.as_str()) == Some("content_block_delta") {
            if let Some(text) = value.pointer("/delta/text").and_then(|t| t.as_str()) {
                let _ = tx.send(StreamEvent::TextDelta { text: text.to_string() }).await;
            }
        }
    }
}
