//! Monitoring Scheduler: the single cooperative task that drives time
//! warnings, transitions, and tangent checks at a fixed cadence.
//!
//! Grounded on `skynet-scheduler::engine::SchedulerEngine::run` — a
//! `tokio::select!` over a fixed `tokio::time::interval` and a
//! `tokio::sync::watch` shutdown signal — generalized from SQLite-backed
//! job polling to polling an in-memory `MeetingState`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use facilitator_agenda::{MeetingState, Transition};
use facilitator_coordinator::{InterventionCoordinator, UtteranceSource};
use facilitator_core::external::DataChannel;
use facilitator_core::{Clock, MeetingStyle, Trigger};
use facilitator_llm::{ItemSummariser, TangentAssessor};
use tokio::sync::{watch, Mutex};
use tracing::{info, instrument, warn};

const HEARTBEAT_SECS: u64 = 60;

pub struct MonitoringScheduler {
    state: Arc<Mutex<MeetingState>>,
    coordinator: Arc<InterventionCoordinator>,
    tangent_assessor: Arc<TangentAssessor>,
    item_summariser: Arc<ItemSummariser>,
    data_channel: Arc<dyn DataChannel>,
    clock: Arc<dyn Clock>,
    monitoring_interval_seconds: u64,
    last_heartbeat_secs: AtomicU64,
}

impl MonitoringScheduler {
    pub fn new(
        state: Arc<Mutex<MeetingState>>,
        coordinator: Arc<InterventionCoordinator>,
        tangent_assessor: Arc<TangentAssessor>,
        item_summariser: Arc<ItemSummariser>,
        data_channel: Arc<dyn DataChannel>,
        clock: Arc<dyn Clock>,
        monitoring_interval_seconds: u64,
    ) -> Self {
        Self {
            state,
            coordinator,
            tangent_assessor,
            item_summariser,
            data_channel,
            clock,
            monitoring_interval_seconds,
            last_heartbeat_secs: AtomicU64::new(0),
        }
    }

    /// Main loop. Ticks at the configured cadence until `shutdown`
    /// broadcasts `true`, or the agenda is exhausted (whichever comes
    /// first).
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.monitoring_interval_seconds, "monitoring scheduler started");
        let mut interval = tokio::time::interval(Duration::from_secs(self.monitoring_interval_seconds));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.tick().await {
                        info!("monitoring scheduler stopping: agenda exhausted");
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("monitoring scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One monitoring tick. Returns `true` if the loop should terminate
    /// (the agenda has no current item left to monitor).
    #[instrument(skip(self))]
    async fn tick(&self) -> bool {
        let now = self.clock.now_secs();

        let style = { self.state.lock().await.style };
        if style == MeetingStyle::Chatting {
            self.publish_snapshot(now, false).await;
            return false;
        }

        let has_current_item = { self.state.lock().await.current_item().is_some() };
        if !has_current_item {
            self.coordinator
                .dispatch(now, "That's everything on the agenda — wrapping up.", Trigger::WrapUp, 0.0, UtteranceSource::Voice)
                .await;
            self.publish_snapshot(now, true).await;
            return true;
        }

        let transition = self.run_time_checks(now).await;
        if !transition {
            self.run_tangent_check(now).await;
        }

        self.publish_snapshot(now, transition).await;
        false
    }

    /// Returns `true` if a `Transition` (or a suppressed-by-cooldown
    /// warning) fired this tick, which suppresses the tangent check below.
    async fn run_time_checks(&self, now: u64) -> bool {
        let outcome = { self.state.lock().await.check_time_state(now) };

        match outcome {
            Transition::EnteredWarning => {
                let cooldown_ok = { self.state.lock().await.cooldown_ok(now) };
                if cooldown_ok {
                    let status = { self.state.lock().await.get_time_status(now) };
                    if let Some(status) = status {
                        let text = format!(
                            "{:.0} minutes left on {}.",
                            status.remaining_minutes.max(0.0),
                            status.topic
                        );
                        self.coordinator.dispatch(now, &text, Trigger::TimeWarning, 0.0, UtteranceSource::Voice).await;
                    }
                } else {
                    info!("time warning suppressed by intervention cooldown");
                }
                false
            }
            Transition::EnteredOvertime => {
                let override_active = { self.state.lock().await.build_context(now, 0.0).override_active };
                if override_active {
                    return false;
                }
                self.advance_and_announce(now).await;
                true
            }
            Transition::NoChange => false,
        }
    }

    async fn advance_and_announce(&self, now: u64) {
        let completed = {
            let mut state = self.state.lock().await;
            let completed_item = state.current_item().cloned();
            state.advance_to_next(now);
            completed_item
        };

        self.coordinator.dispatch(now, "Moving on to the next item.", Trigger::Transition, 0.0, UtteranceSource::Voice).await;

        if let Some(item) = completed {
            self.spawn_item_summarisation(item.id, item.topic);
        }
    }

    fn spawn_item_summarisation(&self, item_id: u32, topic: String) {
        let state = self.state.clone();
        let summariser = self.item_summariser.clone();
        tokio::spawn(async move {
            let transcript = { state.lock().await.item_transcript(item_id).to_vec() };
            let notes = summariser.summarise(&topic, &transcript).await;
            let mut state = state.lock().await;
            state.attach_notes(item_id, notes);
        });
    }

    async fn run_tangent_check(&self, now: u64) {
        let (can_check, recent_empty) = {
            let state = self.state.lock().await;
            let ctx = state.build_context(now, 0.0);
            (state.can_intervene_for_tangent(now), ctx.recent_transcript.is_empty())
        };

        if recent_empty || !can_check {
            return;
        }

        let (topic, elapsed_minutes, allocated_minutes, style, transcript) = {
            let state = self.state.lock().await;
            let ctx = state.build_context(now, 0.0);
            (
                ctx.current_topic.unwrap_or_default(),
                ctx.elapsed_minutes,
                ctx.allocated_minutes,
                ctx.style,
                ctx.recent_transcript,
            )
        };

        let assessment = self.tangent_assessor.assess(&topic, elapsed_minutes, allocated_minutes, style, &transcript).await;

        if assessment.redirect_text.is_empty() {
            return;
        }

        self.coordinator
            .dispatch(now, &assessment.redirect_text, Trigger::Tangent, assessment.confidence, UtteranceSource::Voice)
            .await;
    }

    async fn publish_snapshot(&self, now: u64, force: bool) {
        let last = self.last_heartbeat_secs.load(Ordering::Relaxed);
        if !force && now.saturating_sub(last) < HEARTBEAT_SECS {
            return;
        }

        let snapshot = { self.state.lock().await.snapshot(now) };
        if let Err(e) = self.data_channel.publish("agenda", snapshot).await {
            warn!(error = %e, "failed to publish agenda snapshot");
        }
        self.last_heartbeat_secs.store(now, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use async_trait::async_trait;
    use facilitator_core::config::FacilitatorConfig;
    use facilitator_core::{AgendaItem, ManualClock};
    use facilitator_llm::{ChatRequest, ChatResponse, FastPathLlm};

    use super::*;

    struct NeverCallFastPath;

    #[async_trait]
    impl FastPathLlm for NeverCallFastPath {
        async fn call(&self, _request: &ChatRequest) -> facilitator_llm::error::Result<ChatResponse> {
            Err(facilitator_llm::LlmError::Transport("not reachable in this test".to_string()))
        }
    }

    struct RecordingTts {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl facilitator_core::external::TtsSink for RecordingTts {
        async fn speak(&self, _text: &str, _allow_interruptions: bool) -> facilitator_core::error::Result<()> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        }
    }

    struct RecordingDataChannel {
        publishes: AtomicUsize,
    }

    #[async_trait]
    impl DataChannel for RecordingDataChannel {
        async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> facilitator_core::error::Result<()> {
            self.publishes.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        }
    }

    fn harness(
        items: Vec<AgendaItem>,
        now: u64,
    ) -> (Arc<MonitoringScheduler>, Arc<RecordingTts>, Arc<RecordingDataChannel>, Arc<ManualClock>) {
        let config = FacilitatorConfig::default();
        let mut state = MeetingState::new("Standup", items, facilitator_core::MeetingStyle::Moderate, &config);
        state.start_meeting(now);
        let state = Arc::new(Mutex::new(state));

        let tts = Arc::new(RecordingTts { calls: AtomicUsize::new(0) });
        let data_channel = Arc::new(RecordingDataChannel { publishes: AtomicUsize::new(0) });
        let coordinator =
            Arc::new(InterventionCoordinator::new(state.clone(), tts.clone(), data_channel.clone(), "Beat"));

        let fast_path: Arc<dyn FastPathLlm> = Arc::new(NeverCallFastPath);
        let tangent_assessor = Arc::new(TangentAssessor::new(fast_path.clone(), "claude-test"));
        let item_summariser = Arc::new(ItemSummariser::new(fast_path, "claude-test"));
        let manual_clock = Arc::new(ManualClock::new(now));
        let clock: Arc<dyn Clock> = manual_clock.clone();

        let scheduler = Arc::new(MonitoringScheduler::new(
            state,
            coordinator,
            tangent_assessor,
            item_summariser,
            data_channel.clone(),
            clock,
            15,
        ));

        (scheduler, tts, data_channel, manual_clock)
    }

    #[tokio::test]
    async fn overtime_tick_advances_and_announces_transition() {
        let items = vec![AgendaItem::new(1, "Opening", 1.0), AgendaItem::new(2, "Closing", 5.0)];
        let (scheduler, tts, data_channel, clock) = harness(items, 0);

        // 1 minute allocated => overtime at 60s.
        clock.set(70);

        let terminated = scheduler.tick().await;
        assert!(!terminated);
        assert_eq!(tts.calls.load(AtomicOrdering::SeqCst), 1, "transition should have been spoken");
        assert_eq!(data_channel.publishes.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrap_up_fires_and_terminates_when_agenda_is_exhausted() {
        let items = vec![AgendaItem::new(1, "Only item", 1.0)];
        let (scheduler, tts, _data_channel, clock) = harness(items, 0);
        clock.set(10);

        {
            let mut state = scheduler.state.lock().await;
            state.advance_to_next(10);
        }

        let terminated = scheduler.tick().await;
        assert!(terminated);
        assert_eq!(tts.calls.load(AtomicOrdering::SeqCst), 1);
    }
}
