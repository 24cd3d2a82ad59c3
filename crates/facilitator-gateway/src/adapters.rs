//! Concrete, minimal implementations of the six external collaborator
//! traits from `facilitator_core::external` (§6.1). The real room
//! transport, STT, and TTS services are out of scope for the core engine
//! (§1 Non-goals) and are swapped in by whichever deployment wires this
//! binary up; these adapters are what a local/dev run uses in their place.
//!
//! Grounded on `skynet-channels::channel::Channel` for the
//! small-async-trait-adapter shape.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use facilitator_core::error::{ExternalError, Result};
use facilitator_core::external::{DataChannel, DocumentSink, ParticipantRegistry, TtsSink};
use tracing::info;

/// Prints candidate utterances to the process log instead of synthesising
/// audio. Stands in for a real TTS sink in local/dev runs.
pub struct StdioTtsSink;

#[async_trait]
impl TtsSink for StdioTtsSink {
    async fn speak(&self, text: &str, allow_interruptions: bool) -> Result<()> {
        info!(allow_interruptions, "beat: {text}");
        Ok(())
    }
}

/// Logs every publish instead of pushing to a real room data channel.
pub struct LoggingDataChannel;

#[async_trait]
impl DataChannel for LoggingDataChannel {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        info!(topic, %payload, "data channel publish");
        Ok(())
    }
}

/// Fixed participant set, configured once at startup. A real deployment's
/// registry tracks room join/leave events; this one is handed its roster
/// up front, which is sufficient for a local run where participants don't
/// change mid-meeting.
pub struct StaticParticipantRegistry {
    identities: Mutex<HashSet<String>>,
}

impl StaticParticipantRegistry {
    pub fn new(identities: Vec<String>) -> Self {
        Self { identities: Mutex::new(identities.into_iter().collect()) }
    }
}

#[async_trait]
impl ParticipantRegistry for StaticParticipantRegistry {
    async fn current_identities(&self) -> Result<Vec<String>> {
        Ok(self.identities.lock().unwrap().iter().cloned().collect())
    }

    async fn remove(&self, identity: &str) -> Result<()> {
        self.identities.lock().unwrap().remove(identity);
        Ok(())
    }
}

/// Writes documents to the local filesystem under `base_dir/room_id/filename`.
pub struct FsDocumentSink {
    base_dir: PathBuf,
}

impl FsDocumentSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

#[async_trait]
impl DocumentSink for FsDocumentSink {
    async fn upload(&self, room_id: &str, filename: &str, _title: &str, markdown: &str) -> Result<()> {
        let dir = self.base_dir.join(room_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ExternalError::Document(e.to_string()))?;
        tokio::fs::write(dir.join(filename), markdown)
            .await
            .map_err(|e| ExternalError::Document(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_document_sink_writes_under_room_subdirectory() {
        let base = std::env::temp_dir().join(format!("beat-test-{}", std::process::id()));
        let sink = FsDocumentSink::new(base.clone());

        sink.upload("room-1", "transcript.md", "Transcript", "# hello").await.unwrap();

        let written = tokio::fs::read_to_string(base.join("room-1").join("transcript.md")).await.unwrap();
        assert_eq!(written, "# hello");

        let _ = tokio::fs::remove_dir_all(&base).await;
    }

    #[tokio::test]
    async fn static_registry_reflects_removals() {
        let registry = StaticParticipantRegistry::new(vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(registry.current_identities().await.unwrap().len(), 2);

        registry.remove("alice").await.unwrap();
        let remaining = registry.current_identities().await.unwrap();
        assert_eq!(remaining, vec!["bob".to_string()]);
    }
}
