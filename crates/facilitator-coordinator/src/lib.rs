//! Intervention Coordinator: the single point through which any candidate
//! utterance reaches a participant, whether by voice or by chat.
//!
//! Grounded on `skynet-sessions::manager::SessionManager` for the
//! "lock, build a snapshot, release, act" discipline around a shared
//! `Arc<Mutex<_>>` state, and on `skynet-hooks::engine::HookEngine::emit`
//! for the log-then-dispatch shape.

use std::sync::Arc;

use facilitator_agenda::MeetingState;
use facilitator_core::{external::DataChannel, external::TtsSink, GateResult, Trigger};
use facilitator_gate::evaluate;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Where a candidate utterance originated. Voice-originated speak results
/// go to the TTS sink; chat-originated ones are published back on the
/// `chat` data channel instead, per the chat-mention contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceSource {
    Voice,
    Chat,
}

pub struct InterventionCoordinator {
    state: Arc<Mutex<MeetingState>>,
    tts: Arc<dyn TtsSink>,
    data_channel: Arc<dyn DataChannel>,
    bot_name: String,
}

impl InterventionCoordinator {
    pub fn new(
        state: Arc<Mutex<MeetingState>>,
        tts: Arc<dyn TtsSink>,
        data_channel: Arc<dyn DataChannel>,
        bot_name: impl Into<String>,
    ) -> Self {
        Self { state, tts, data_channel, bot_name: bot_name.into() }
    }

    /// Runs one candidate utterance through the Speech Gate and, on a
    /// Speak verdict, dispatches it to the appropriate sink. Returns the
    /// gate's verdict so the caller can log or test against it.
    pub async fn dispatch(
        &self,
        now: u64,
        candidate_text: &str,
        trigger: Trigger,
        tangent_confidence: f64,
        source: UtteranceSource,
    ) -> GateResult {
        let context = {
            let state = self.state.lock().await;
            state.build_context(now, tangent_confidence)
        };

        let result = evaluate(candidate_text, trigger, &context);

        if !result.is_speak() {
            info!(
                trigger = ?result.trigger,
                reason = result.reason,
                confidence = result.confidence,
                "intervention suppressed"
            );
            return result;
        }

        let dispatched = match source {
            UtteranceSource::Voice => self.tts.speak(&result.text, allows_interruption(result.trigger)).await,
            UtteranceSource::Chat => {
                let payload = serde_json::json!({
                    "type": "chat_message",
                    "sender": self.bot_name,
                    "text": result.text,
                    "is_agent": true,
                });
                self.data_channel.publish("chat", payload).await
            }
        };

        match dispatched {
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.record_intervention(now);
                info!(trigger = ?result.trigger, reason = result.reason, "intervention dispatched");
            }
            Err(e) => {
                warn!(error = %e, trigger = ?result.trigger, "intervention dispatch failed");
            }
        }

        result
    }
}

/// Time-pressure triggers should not be barged over; a direct answer to a
/// question can be.
fn allows_interruption(trigger: Trigger) -> bool {
    matches!(trigger, Trigger::DirectQuestion | Trigger::NamedAddress)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use facilitator_core::config::FacilitatorConfig;
    use facilitator_core::{AgendaItem, MeetingStyle};

    use super::*;

    struct RecordingTts {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TtsSink for RecordingTts {
        async fn speak(&self, _text: &str, _allow_interruptions: bool) -> facilitator_core::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingDataChannel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataChannel for RecordingDataChannel {
        async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> facilitator_core::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn meeting_state() -> Arc<Mutex<MeetingState>> {
        let items = vec![AgendaItem::new(1, "Opening", 10.0)];
        let mut state = MeetingState::new("Standup", items, MeetingStyle::Moderate, &FacilitatorConfig::default());
        state.start_meeting(0);
        Arc::new(Mutex::new(state))
    }

    #[tokio::test]
    async fn speak_result_goes_to_tts_for_voice_source_and_records_intervention() {
        let state = meeting_state();
        let tts = Arc::new(RecordingTts { calls: AtomicUsize::new(0) });
        let data_channel = Arc::new(RecordingDataChannel { calls: AtomicUsize::new(0) });
        let coordinator =
            InterventionCoordinator::new(state.clone(), tts.clone(), data_channel.clone(), "Beat");

        let result =
            coordinator.dispatch(10, "Welcome to the meeting", Trigger::Intro, 0.0, UtteranceSource::Voice).await;

        assert!(result.is_speak());
        assert_eq!(tts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(data_channel.calls.load(Ordering::SeqCst), 0);
        assert!(!state.lock().await.cooldown_ok(10), "intervention at t=10 should still be on cooldown at t=10");
    }

    #[tokio::test]
    async fn chat_originated_reply_goes_to_data_channel_not_tts() {
        let state = meeting_state();
        let tts = Arc::new(RecordingTts { calls: AtomicUsize::new(0) });
        let data_channel = Arc::new(RecordingDataChannel { calls: AtomicUsize::new(0) });
        let coordinator =
            InterventionCoordinator::new(state.clone(), tts.clone(), data_channel.clone(), "Beat");

        coordinator
            .dispatch(10, "We decided to ship Friday", Trigger::DirectQuestion, 0.0, UtteranceSource::Chat)
            .await;

        assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
        assert_eq!(data_channel.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn silent_result_dispatches_nothing() {
        let state = meeting_state();
        let tts = Arc::new(RecordingTts { calls: AtomicUsize::new(0) });
        let data_channel = Arc::new(RecordingDataChannel { calls: AtomicUsize::new(0) });
        let coordinator = InterventionCoordinator::new(state, tts.clone(), data_channel.clone(), "Beat");

        let result = coordinator.dispatch(10, "", Trigger::Tangent, 0.0, UtteranceSource::Voice).await;

        assert!(!result.is_speak());
        assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
        assert_eq!(data_channel.calls.load(Ordering::SeqCst), 0);
    }
}
