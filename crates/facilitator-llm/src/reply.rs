//! Freeform facilitator replies: the "General" fall-through destination
//! when the Command Router finds no deterministic intent (§4.2 item 8).
//!
//! Shares `CustomDocumentComposer`'s stream-and-collect shape — same large
//! path, same timeout pattern — just a different system prompt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{LlmError, Result};
use crate::large_path::LargePathLlm;
use crate::types::{ChatRequest, StreamEvent};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Composes one conversational reply to an utterance the Command Router
/// could not classify deterministically.
pub struct GeneralReplyComposer {
    llm: Arc<dyn LargePathLlm>,
    model: String,
}

impl GeneralReplyComposer {
    pub fn new(llm: Arc<dyn LargePathLlm>, model: impl Into<String>) -> Self {
        Self { llm, model: model.into() }
    }

    pub async fn reply(
        &self,
        meeting_title: &str,
        current_topic: Option<&str>,
        meeting_memory: &str,
        utterance: &str,
    ) -> Result<String> {
        let topic_line = current_topic.map(|t| format!("The current agenda item is \"{t}\".")).unwrap_or_default();
        let system = format!(
            "You are facilitating the meeting \"{meeting_title}\". {topic_line} \
             Reply briefly and conversationally to what was just said. \
             What you know about the meeting so far:\n{meeting_memory}"
        );
        let request = ChatRequest::new(&self.model, system).with_user_message(utterance).with_max_tokens(512);

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
                warn!(error = message, "general reply composer: stream reported an error");
                Err(LlmError::Api(message))
            }
            Ok((text, None)) => {
                if let Err(e) = call_result {
                    warn!(error = %e, "general reply composer: stream task failed after collecting output");
                }
                Ok(text)
            }
            Err(_) => {
                warn!(budget_ms = TIMEOUT.as_millis(), "general reply composer: timed out");
                Err(LlmError::Timeout { budget_ms: TIMEOUT.as_millis() as u64 })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct StubLargePath {
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl LargePathLlm for StubLargePath {
        async fn stream(&self, _request: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<()> {
            for chunk in &self.chunks {
                let _ = tx.send(StreamEvent::TextDelta { text: chunk.to_string() }).await;
            }
            let _ = tx.send(StreamEvent::Done).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn collects_streamed_text_into_one_reply() {
        let composer = GeneralReplyComposer::new(
            Arc::new(StubLargePath { chunks: vec!["Sounds ", "good, ", "let's continue."] }),
            "claude-test",
        );

        let reply = composer.reply("Standup", Some("Blockers"), "", "anything else to add?").await.unwrap();
        assert_eq!(reply, "Sounds good, let's continue.");
    }
}
