use std::sync::Arc;
use std::time::Duration;

use facilitator_core::{ItemNotes, TranscriptEntry};
use serde::Deserialize;
use tracing::warn;

use crate::fast_path::FastPathLlm;
use crate::types::{ChatRequest, ToolDefinition};

const TIMEOUT: Duration = Duration::from_secs(15);
const TOOL_NAME: &str = "record_item_notes";

#[derive(Debug, Deserialize, Default)]
struct RawNotes {
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    decisions: Vec<String>,
    #[serde(default)]
    action_items: Vec<String>,
}

/// Produces `ItemNotes` for a just-completed agenda item. On any failure —
/// timeout, transport error, malformed tool input — attaches an empty
/// `ItemNotes` and does not retry, per the documented failure mode.
pub struct ItemSummariser {
    llm: Arc<dyn FastPathLlm>,
    model: String,
}

impl ItemSummariser {
    pub fn new(llm: Arc<dyn FastPathLlm>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    pub async fn summarise(&self, topic: &str, transcript: &[TranscriptEntry]) -> ItemNotes {
        if transcript.is_empty() {
            return ItemNotes::default();
        }

        let system = format!(
            "Summarise the discussion of agenda item \"{topic}\" into key points, decisions, \
             and action items. Keep each entry to one sentence."
        );
        let transcript_text =
            transcript.iter().map(|e| format!("{}: {}", e.speaker, e.text)).collect::<Vec<_>>().join("\n");

        let request = ChatRequest::new(&self.model, system)
            .with_user_message(transcript_text)
            .with_max_tokens(1024)
            .with_tool(tool_definition());

        match tokio::time::timeout(TIMEOUT, self.llm.call(&request)).await {
            Ok(Ok(response)) => match response.tool_call {
                Some(call) => match serde_json::from_value::<RawNotes>(call.input) {
                    Ok(raw) => ItemNotes {
                        key_points: raw.key_points,
                        decisions: raw.decisions,
                        action_items: raw.action_items,
                    },
                    Err(e) => {
                        warn!(error = %e, topic, "item summariser: malformed tool input");
                        ItemNotes::default()
                    }
                },
                None => {
                    warn!(topic, "item summariser: model did not call the forced tool");
                    ItemNotes::default()
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, topic, "item summariser: LM call failed");
                ItemNotes::default()
            }
            Err(_) => {
                warn!(budget_ms = TIMEOUT.as_millis(), topic, "item summariser: timed out");
                ItemNotes::default()
            }
        }
    }
}

fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Record key points, decisions, and action items from the discussion".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "key_points": { "type": "array", "items": { "type": "string" } },
                "decisions": { "type": "array", "items": { "type": "string" } },
                "action_items": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["key_points", "decisions", "action_items"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::{LlmError, Result as LlmResult};
    use crate::types::{ChatResponse, ToolCall};

    struct StubFastPath {
        response: LlmResult<ChatResponse>,
    }

    #[async_trait]
    impl FastPathLlm for StubFastPath {
        async fn call(&self, _request: &ChatRequest) -> LlmResult<ChatResponse> {
            match &self.response {
                Ok(r) => Ok(r.clone()),
                Err(_) => Err(LlmError::Transport("boom".to_string())),
            }
        }
    }

    fn entry(speaker: &str, text: &str) -> TranscriptEntry {
        TranscriptEntry { speaker: speaker.to_string(), text: text.to_string(), timestamp: 0 }
    }

    #[tokio::test]
    async fn empty_transcript_skips_the_llm_call_entirely() {
        let stub = StubFastPath { response: Err(LlmError::Transport("should never be called".into())) };
        let summariser = ItemSummariser::new(Arc::new(stub), "claude-test");
        let notes = summariser.summarise("Budget", &[]).await;
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn failure_attaches_empty_notes() {
        let stub = StubFastPath { response: Err(LlmError::Transport("down".into())) };
        let summariser = ItemSummariser::new(Arc::new(stub), "claude-test");
        let notes = summariser.summarise("Budget", &[entry("alice", "we discussed spend")]).await;
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn success_passes_through_structured_notes() {
        let stub = StubFastPath {
            response: Ok(ChatResponse {
                content: String::new(),
                tool_call: Some(ToolCall {
                    name: TOOL_NAME.to_string(),
                    input: serde_json::json!({
                        "key_points": ["Budget is on track"],
                        "decisions": ["Approved Q3 spend"],
                        "action_items": ["Alice to send breakdown"]
                    }),
                }),
            }),
        };
        let summariser = ItemSummariser::new(Arc::new(stub), "claude-test");
        let notes = summariser.summarise("Budget", &[entry("alice", "we discussed spend")]).await;
        assert_eq!(notes.decisions, vec!["Approved Q3 spend".to_string()]);
        assert_eq!(notes.action_items, vec!["Alice to send breakdown".to_string()]);
    }
}
