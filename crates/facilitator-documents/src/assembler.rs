//! Document Assembler: builds and delivers the post-meeting document set.
//!
//! Grounded on `skynet-memory::manager::MemoryManager::render_context` for
//! the "walk a collection, build section headers, join into one markdown
//! blob" shape, generalized from a single rendered context to five
//! independent documents with their own upload/delivery step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use facilitator_agenda::MeetingState;
use facilitator_core::external::{DataChannel, DocumentSink};
use facilitator_core::{error::Result, Document, DocumentType, ItemState};
use facilitator_llm::CustomDocumentComposer;
use tracing::{info, warn};

use crate::format::elapsed_mmss;

/// Assembles and delivers the fixed document set (transcript, summary,
/// optional attendance/action-items, and any freeform custom requests) at
/// most once per meeting.
pub struct DocumentAssembler {
    sink: Arc<dyn DocumentSink>,
    data_channel: Arc<dyn DataChannel>,
    document_composer: Arc<CustomDocumentComposer>,
    assembled: AtomicBool,
}

impl DocumentAssembler {
    pub fn new(
        sink: Arc<dyn DocumentSink>,
        data_channel: Arc<dyn DataChannel>,
        document_composer: Arc<CustomDocumentComposer>,
    ) -> Self {
        Self { sink, data_channel, document_composer, assembled: AtomicBool::new(false) }
    }

    /// Builds every applicable document, uploads each, and publishes the
    /// "docs ready" signal. A second call for the same meeting is a no-op —
    /// this is the idempotency flag required by §4.8.
    pub async fn assemble(&self, room_id: &str, state: &MeetingState, now: u64) -> Result<()> {
        if self.assembled.swap(true, Ordering::SeqCst) {
            warn!(room_id, "document assembler invoked more than once; ignoring");
            return Ok(());
        }

        let documents = self.build_documents(state, now).await;
        info!(room_id, count = documents.len(), "assembled post-meeting documents");

        for doc in &documents {
            if let Err(e) = self.sink.upload(room_id, &doc.filename, &doc.title, &doc.markdown).await {
                warn!(error = %e, filename = %doc.filename, "failed to upload document");
            }
        }

        let signal = serde_json::json!({ "type": "docs_ready", "room_id": room_id });
        if let Err(e) = self.data_channel.publish("agenda", signal).await {
            warn!(error = %e, "failed to publish docs ready signal");
        }

        Ok(())
    }

    async fn build_documents(&self, state: &MeetingState, now: u64) -> Vec<Document> {
        let mut documents = vec![self.build_transcript(state), self.build_summary(state)];

        let attendance_requested =
            state.document_requests().iter().any(|r| r.doc_type == DocumentType::Attendance);
        if attendance_requested || !state.participants.is_empty() {
            documents.push(self.build_attendance(state, now));
        }

        let action_items_requested =
            state.document_requests().iter().any(|r| r.doc_type == DocumentType::ActionItems);
        if action_items_requested {
            documents.push(self.build_action_items(state));
        }

        for request in state.document_requests().iter().filter(|r| r.doc_type == DocumentType::Custom) {
            match self.document_composer.compose(&request.description, &state.title, &state.meeting_memory()).await
            {
                Ok(markdown) => {
                    documents.push(Document {
                        title: request.description.clone(),
                        filename: format!("{}.md", request.slug),
                        markdown,
                    });
                }
                Err(e) => {
                    warn!(error = %e, slug = %request.slug, "custom document composition failed; skipping");
                }
            }
        }

        documents
    }

    fn build_transcript(&self, state: &MeetingState) -> Document {
        let mut markdown = format!("# Transcript — {}\n\n", state.title);
        for item in &state.items {
            let entries = state.item_transcript(item.id);
            if entries.is_empty() {
                continue;
            }
            markdown.push_str(&format!("## {}\n", item.topic));
            for entry in entries {
                let ts = elapsed_mmss(entry.timestamp, state.meeting_start);
                markdown.push_str(&format!("[{ts}] {}: {}\n", entry.speaker, entry.text));
            }
            markdown.push('\n');
        }
        Document { title: "Transcript".to_string(), filename: "transcript.md".to_string(), markdown }
    }

    fn build_summary(&self, state: &MeetingState) -> Document {
        let memory = state.meeting_memory();
        let markdown = if memory.is_empty() {
            format!("# Summary — {}\n\nNo items were completed with notes.\n", state.title)
        } else {
            format!("# Summary — {}\n\n{memory}", state.title)
        };
        Document { title: "Summary".to_string(), filename: "summary.md".to_string(), markdown }
    }

    fn build_attendance(&self, state: &MeetingState, now: u64) -> Document {
        let mut markdown = format!("# Attendance — {}\n\n", state.title);
        markdown.push_str("| Participant | First seen | Last seen |\n|---|---|---|\n");
        let mut identities: Vec<_> = state.participants.iter().collect();
        identities.sort_by_key(|(identity, _)| identity.clone());
        for (identity, info) in &identities {
            markdown.push_str(&format!(
                "| {identity} | {} | {} |\n",
                elapsed_mmss(info.first_seen, state.meeting_start),
                elapsed_mmss(info.last_seen, state.meeting_start),
            ));
        }
        markdown.push_str(&format!("\nTotal participants: {}\n", identities.len()));
        let _ = now;
        Document { title: "Attendance".to_string(), filename: "attendance.md".to_string(), markdown }
    }

    fn build_action_items(&self, state: &MeetingState) -> Document {
        let mut markdown = format!("# Action Items — {}\n\n", state.title);
        let mut any = false;
        for item in state.items.iter().filter(|i| i.state == ItemState::Completed) {
            let Some(notes) = &item.notes else { continue };
            if notes.action_items.is_empty() {
                continue;
            }
            any = true;
            markdown.push_str(&format!("## {}\n", item.topic));
            for action in &notes.action_items {
                markdown.push_str(&format!("- {action}\n"));
            }
        }
        if !any {
            markdown.push_str("No action items were recorded.\n");
        }
        Document { title: "Action Items".to_string(), filename: "action-items.md".to_string(), markdown }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use facilitator_core::config::FacilitatorConfig;
    use facilitator_core::{AgendaItem, DocumentRequest, ItemNotes, MeetingStyle, ParticipantInfo};
    use serde_json::Value;
    use std::sync::Mutex as StdMutex;

    use super::*;

    struct RecordingSink {
        uploads: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DocumentSink for RecordingSink {
        async fn upload(&self, _room_id: &str, filename: &str, title: &str, _markdown: &str) -> Result<()> {
            self.uploads.lock().unwrap().push((filename.to_string(), title.to_string()));
            Ok(())
        }
    }

    struct RecordingDataChannel {
        published: StdMutex<Vec<Value>>,
    }

    #[async_trait]
    impl DataChannel for RecordingDataChannel {
        async fn publish(&self, _topic: &str, payload: Value) -> Result<()> {
            self.published.lock().unwrap().push(payload);
            Ok(())
        }
    }

    struct NeverCallLargePath;

    #[async_trait]
    impl facilitator_llm::LargePathLlm for NeverCallLargePath {
        async fn stream(
            &self,
            _request: &facilitator_llm::ChatRequest,
            _tx: tokio::sync::mpsc::Sender<facilitator_llm::StreamEvent>,
        ) -> facilitator_llm::error::Result<()> {
            Ok(())
        }
    }

    fn sample_state() -> MeetingState {
        let items = vec![AgendaItem::new(1, "Opening", 1.0)];
        let mut state = MeetingState::new("Standup", items, MeetingStyle::Moderate, &FacilitatorConfig::default());
        state.start_meeting(0);
        state.record_participant("alice", 0);
        state.record_participant("bob", 5);
        state.append_transcript("alice", "let's get started", 2);
        state.advance_to_next(60);
        state.attach_notes(
            1,
            ItemNotes {
                key_points: vec!["kicked off on time".to_string()],
                decisions: vec![],
                action_items: vec!["send recap".to_string()],
            },
        );
        state
    }

    fn assembler() -> (Arc<RecordingSink>, Arc<RecordingDataChannel>, DocumentAssembler) {
        let sink = Arc::new(RecordingSink { uploads: StdMutex::new(Vec::new()) });
        let data_channel = Arc::new(RecordingDataChannel { published: StdMutex::new(Vec::new()) });
        let composer = Arc::new(CustomDocumentComposer::new(Arc::new(NeverCallLargePath), "claude-test"));
        let doc_assembler = DocumentAssembler::new(sink.clone(), data_channel.clone(), composer);
        (sink, data_channel, doc_assembler)
    }

    #[tokio::test]
    async fn assembles_transcript_summary_and_attendance_by_default() {
        let state = sample_state();
        let (sink, data_channel, doc_assembler) = assembler();

        doc_assembler.assemble("room-1", &state, 60).await.unwrap();

        let uploads = sink.uploads.lock().unwrap();
        let filenames: Vec<_> = uploads.iter().map(|(f, _)| f.clone()).collect();
        assert!(filenames.contains(&"transcript.md".to_string()));
        assert!(filenames.contains(&"summary.md".to_string()));
        assert!(filenames.contains(&"attendance.md".to_string()));
        assert!(!filenames.contains(&"action-items.md".to_string()));

        let published = data_channel.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["type"], "docs_ready");
    }

    #[tokio::test]
    async fn second_call_is_a_no_op() {
        let state = sample_state();
        let (sink, _data_channel, doc_assembler) = assembler();

        doc_assembler.assemble("room-1", &state, 60).await.unwrap();
        doc_assembler.assemble("room-1", &state, 90).await.unwrap();

        assert_eq!(sink.uploads.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn action_items_built_only_when_requested() {
        let mut state = sample_state();
        state.queue_document_request(DocumentRequest {
            doc_type: DocumentType::ActionItems,
            description: "action items".to_string(),
            slug: "action-items".to_string(),
        });
        let (sink, _data_channel, doc_assembler) = assembler();

        doc_assembler.assemble("room-1", &state, 60).await.unwrap();

        let uploads = sink.uploads.lock().unwrap();
        assert!(uploads.iter().any(|(f, _)| f == "action-items.md"));
    }

    #[test]
    fn participant_info_survives_into_attendance_rows() {
        let info = ParticipantInfo { first_seen: 0, last_seen: 5 };
        assert_eq!(info.first_seen, 0);
    }
}
