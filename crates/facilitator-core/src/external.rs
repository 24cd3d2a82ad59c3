//! Small, object-safe traits for the collaborators the engine treats as
//! external (§6.1 of the spec): the TTS sink, the room data channel, the
//! participant registry, and the document sink. The two LM paths live in
//! `facilitator-llm` since they carry their own request/response shapes.
//!
//! Grounded on `skynet-channels::channel::Channel` and
//! `skynet-agent::provider::LlmProvider`: small `async_trait`s, `Send + Sync`,
//! mockable in tests without any real room or network call.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Synthesises and plays a candidate utterance. Errors are non-fatal —
/// callers log and continue; no retry is attempted by the engine itself.
#[async_trait]
pub trait TtsSink: Send + Sync {
    /// Queue `text` for playback. Returns once synthesis has been queued,
    /// not once playback finishes.
    async fn speak(&self, text: &str, allow_interruptions: bool) -> Result<()>;
}

/// Reliable publish/receive over the room's data channel, keyed by topic
/// (`"agenda"`, `"chat"`).
#[async_trait]
pub trait DataChannel: Send + Sync {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;
}

/// Enumerates and manages participant identities in the room.
#[async_trait]
pub trait ParticipantRegistry: Send + Sync {
    async fn current_identities(&self) -> Result<Vec<String>>;

    /// Remove a participant by identity — used for bot-removal control.
    async fn remove(&self, identity: &str) -> Result<()>;
}

/// Delivers a finished document. Idempotent per `(room_id, filename)`.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn upload(&self, room_id: &str, filename: &str, title: &str, markdown: &str) -> Result<()>;
}
