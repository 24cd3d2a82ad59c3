use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{LlmError, Result};
use crate::large_path::LargePathLlm;
use crate::types::{ChatRequest, StreamEvent};

const TIMEOUT: Duration = Duration::from_secs(30);

/// Generates the markdown body for a freeform ("Custom") post-meeting
/// document by streaming a large chat completion and collecting it
/// verbatim — no structured schema, no truncation.
pub struct CustomDocumentComposer {
    llm: Arc<dyn LargePathLlm>,
    model: String,
}

impl CustomDocumentComposer {
    pub fn new(llm: Arc<dyn LargePathLlm>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    /// `meeting_memory` is the accumulated per-item notes, folded into the
    /// system prompt so the document can reference decisions made earlier.
    pub async fn compose(&self, description: &str, meeting_title: &str, meeting_memory: &str) -> Result<String> {
        let system = format!(
            "Write a markdown document for the meeting \"{meeting_title}\" per this request: \
             \"{description}\". Use what you know about the meeting so far:\n{meeting_memory}"
        );
        let request = ChatRequest::new(&self.model, system).with_user_message(description).with_max_tokens(4096);

        let (tx, mut rx) = mpsc::channel(32);
        let call = self.llm.stream(&request, tx);

        let collected = tokio::time::timeout(TIMEOUT, async move {
            let mut text = String::new();
            let mut saw_error = None;
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::TextDelta { text: delta } => text.push_str(&delta),
                    StreamEvent::Done => break,
                    StreamEvent::Error { message } => saw_error = Some(message),
                }
            }
            (text, saw_error)
        });

        let (call_result, collect_result) = tokio::join!(call, collected);

        match collect_result {
            Ok((_text, Some(message))) => {
                warn!(error = message, "custom document composer: stream reported an error");
                Err(LlmError::Api(message))
            }
            Ok((text, None)) => {
                if let Err(e) = call_result {
                    warn!(error = %e, "custom document composer: stream task failed after collecting output");
                }
                Ok(text)
            }
            Err(_) => {
                warn!(budget_ms = TIMEOUT.as_millis(), "custom document composer: timed out");
                Err(LlmError::Timeout { budget_ms: TIMEOUT.as_millis() as u64 })
            }
        }
    }
}
