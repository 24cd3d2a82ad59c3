use std::sync::Arc;
use std::time::Duration;

use facilitator_core::{MeetingStyle, TranscriptEntry};
use serde::Deserialize;
use tracing::warn;

use crate::fast_path::FastPathLlm;
use crate::types::{ChatRequest, ToolDefinition};

const TIMEOUT: Duration = Duration::from_secs(5);
const TOOL_NAME: &str = "assess_tangent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentClassification {
    OnTrack,
    Drifting,
    OffTopic,
    TimeExceeded,
    ProductiveDiscussion,
}

/// Result of a single Tangent Assessor call. Always well-formed — malformed
/// or failed calls are normalized to `on_track` / `0.0` / empty text by
/// `TangentAssessor::assess` itself, never surfaced as an error.
#[derive(Debug, Clone)]
pub struct TangentAssessment {
    pub classification: TangentClassification,
    pub confidence: f64,
    /// Suggested spoken redirect. Empty when no intervention is warranted.
    pub redirect_text: String,
}

impl TangentAssessment {
    fn on_track() -> Self {
        Self { classification: TangentClassification::OnTrack, confidence: 0.0, redirect_text: String::new() }
    }
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    classification: TangentClassification,
    confidence: f64,
    #[serde(default)]
    redirect_text: String,
}

/// Classifies the recent transcript against the current topic using a fast
/// tool-calling LM call. Never invoked more than once per monitoring tick
/// (enforced by the caller, not this type).
pub struct TangentAssessor {
    llm: Arc<dyn FastPathLlm>,
    model: String,
}

impl TangentAssessor {
    pub fn new(llm: Arc<dyn FastPathLlm>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    pub async fn assess(
        &self,
        topic: &str,
        elapsed_minutes: f64,
        allocated_minutes: f64,
        style: MeetingStyle,
        recent_transcript: &[TranscriptEntry],
    ) -> TangentAssessment {
        let system = format!(
            "You are monitoring a {style:?} meeting discussing \"{topic}\". \
             {elapsed_minutes:.1} of {allocated_minutes:.1} allocated minutes have elapsed. \
             Classify whether the last minute of conversation is still on topic."
        );

        let transcript_text = recent_transcript
            .iter()
            .map(|e| format!("{}: {}", e.speaker, e.text))
            .collect::<Vec<_>>()
            .join("\n");

        let request = ChatRequest::new(&self.model, system)
            .with_user_message(transcript_text)
            .with_max_tokens(256)
            .with_tool(tool_definition());

        match tokio::time::timeout(TIMEOUT, self.llm.call(&request)).await {
            Ok(Ok(response)) => match response.tool_call {
                Some(call) => match serde_json::from_value::<RawAssessment>(call.input) {
                    Ok(raw) => TangentAssessment {
                        classification: raw.classification,
                        confidence: raw.confidence.clamp(0.0, 1.0),
                        redirect_text: raw.redirect_text,
                    },
                    Err(e) => {
                        warn!(error = %e, "tangent assessor: malformed tool input");
                        TangentAssessment::on_track()
                    }
                },
                None => {
                    warn!("tangent assessor: model did not call the forced tool");
                    TangentAssessment::on_track()
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, "tangent assessor: LM call failed");
                TangentAssessment::on_track()
            }
            Err(_) => {
                warn!(budget_ms = TIMEOUT.as_millis(), "tangent assessor: timed out");
                TangentAssessment::on_track()
            }
        }
    }
}

fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Report whether the recent conversation is on topic".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "classification": {
                    "type": "string",
                    "enum": ["on_track", "drifting", "off_topic", "time_exceeded", "productive_discussion"]
                },
                "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "redirect_text": { "type": "string" }
            },
            "required": ["classification", "confidence"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::Result as LlmResult;
    use crate::types::ChatResponse;

    struct StubFastPath {
        response: LlmResult<ChatResponse>,
    }

    #[async_trait]
    impl FastPathLlm for StubFastPath {
        async fn call(&self, _request: &ChatRequest) -> LlmResult<ChatResponse> {
            match &self.response {
                Ok(r) => Ok(r.clone()),
                Err(_) => Err(crate::error::LlmError::Transport("boom".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn malformed_tool_input_falls_back_to_on_track() {
        let stub = StubFastPath {
            response: Ok(ChatResponse {
                content: String::new(),
                tool_call: Some(crate::types::ToolCall {
                    name: TOOL_NAME.to_string(),
                    input: serde_json::json!({ "nonsense": true }),
                }),
            }),
        };
        let assessor = TangentAssessor::new(Arc::new(stub), "claude-test");
        let result = assessor.assess("Roadmap", 4.0, 10.0, MeetingStyle::Moderate, &[]).await;
        assert_eq!(result.classification, TangentClassification::OnTrack);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_on_track() {
        let stub = StubFastPath { response: Err(crate::error::LlmError::Transport("down".into())) };
        let assessor = TangentAssessor::new(Arc::new(stub), "claude-test");
        let result = assessor.assess("Roadmap", 4.0, 10.0, MeetingStyle::Moderate, &[]).await;
        assert_eq!(result.classification, TangentClassification::OnTrack);
    }

    #[tokio::test]
    async fn well_formed_response_passes_through() {
        let stub = StubFastPath {
            response: Ok(ChatResponse {
                content: String::new(),
                tool_call: Some(crate::types::ToolCall {
                    name: TOOL_NAME.to_string(),
                    input: serde_json::json!({
                        "classification": "off_topic",
                        "confidence": 0.91,
                        "redirect_text": "Let's circle back to the roadmap."
                    }),
                }),
            }),
        };
        let assessor = TangentAssessor::new(Arc::new(stub), "claude-test");
        let result = assessor.assess("Roadmap", 8.0, 10.0, MeetingStyle::Moderate, &[]).await;
        assert_eq!(result.classification, TangentClassification::OffTopic);
        assert!((result.confidence - 0.91).abs() < 1e-9);
        assert_eq!(result.redirect_text, "Let's circle back to the roadmap.");
    }
}
