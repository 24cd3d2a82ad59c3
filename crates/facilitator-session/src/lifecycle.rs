//! Session Lifecycle: the single entry point per room. Connects the room's
//! first participant, parses the agenda, constructs the `MeetingState`,
//! and runs a `tokio::select!` event loop over transcript and control
//! events until a termination signal fires.
//!
//! Grounded on `skynet-gateway::ws::connection::handle_connection` for the
//! "per-connection task, select! over input + ticks + shutdown, dispatch
//! into a handler" shape, and on `skynet-gateway::app::AppState` for
//! bundling a session's collaborators into one constructed struct.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use facilitator_agenda::MeetingState;
use facilitator_coordinator::{InterventionCoordinator, UtteranceSource};
use facilitator_core::config::FacilitatorConfig;
use facilitator_core::external::{DataChannel, DocumentSink, ParticipantRegistry, TtsSink};
use facilitator_core::{Clock, MeetingStyle, Trigger};
use facilitator_documents::DocumentAssembler;
use facilitator_llm::{
    CustomDocumentComposer, FastPathLlm, GeneralReplyComposer, ItemSummariser, LargePathLlm, TangentAssessor,
};
use facilitator_router::{CommandRouter, Intent};
use facilitator_scheduler::MonitoringScheduler;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::events::{ControlEvent, TranscriptEvent};
use crate::metadata::RoomMetadata;

/// The collaborators the Session Lifecycle needs but does not itself
/// implement — bundled the way `skynet-gateway::app::AppState` bundles an
/// `AgentRuntime`/`MemoryManager`/etc. into one constructor call.
pub struct SessionDependencies {
    pub tts: Arc<dyn TtsSink>,
    pub data_channel: Arc<dyn DataChannel>,
    pub participant_registry: Arc<dyn ParticipantRegistry>,
    pub document_sink: Arc<dyn DocumentSink>,
    pub fast_path_llm: Arc<dyn FastPathLlm>,
    pub large_path_llm: Arc<dyn LargePathLlm>,
    pub clock: Arc<dyn Clock>,
    pub fast_model: String,
    pub large_model: String,
}

pub struct SessionLifecycle {
    room_id: String,
    state: Arc<Mutex<MeetingState>>,
    coordinator: Arc<InterventionCoordinator>,
    data_channel: Arc<dyn DataChannel>,
    router: CommandRouter,
    document_assembler: Arc<DocumentAssembler>,
    general_reply: Arc<GeneralReplyComposer>,
    item_summariser: Arc<ItemSummariser>,
    clock: Arc<dyn Clock>,
    bot_name: String,
    override_grace_seconds: u64,
    end_requested: AtomicBool,
}

impl SessionLifecycle {
    /// Waits for the first human participant, constructs the
    /// `MeetingState`, emits the Intro candidate, and spawns the
    /// Monitoring Scheduler. Returns the lifecycle plus a handle on the
    /// scheduler task and its shutdown sender, for `run` to supervise.
    pub async fn bootstrap(
        room_id: impl Into<String>,
        metadata: RoomMetadata,
        config: &FacilitatorConfig,
        deps: SessionDependencies,
    ) -> Result<(Arc<Self>, tokio::task::JoinHandle<()>, watch::Sender<bool>)> {
        let room_id = room_id.into();

        wait_for_first_participant(deps.participant_registry.as_ref(), Duration::from_secs(2), Duration::from_secs(600))
            .await?;

        let now = deps.clock.now_secs();
        let mut state = MeetingState::new(format!("Meeting {room_id}"), metadata.agenda, metadata.style, config);
        state.start_meeting(now);
        let state = Arc::new(Mutex::new(state));

        let coordinator = Arc::new(InterventionCoordinator::new(
            state.clone(),
            deps.tts.clone(),
            deps.data_channel.clone(),
            config.bot_name.clone(),
        ));

        let router = CommandRouter::new(&config.bot_name)?;

        let document_composer =
            Arc::new(CustomDocumentComposer::new(deps.large_path_llm.clone(), deps.large_model.clone()));
        let document_assembler =
            Arc::new(DocumentAssembler::new(deps.document_sink.clone(), deps.data_channel.clone(), document_composer));

        let general_reply = Arc::new(GeneralReplyComposer::new(deps.large_path_llm.clone(), deps.large_model.clone()));

        let tangent_assessor = Arc::new(TangentAssessor::new(deps.fast_path_llm.clone(), deps.fast_model.clone()));
        let item_summariser = Arc::new(ItemSummariser::new(deps.fast_path_llm.clone(), deps.fast_model.clone()));

        let scheduler = Arc::new(MonitoringScheduler::new(
            state.clone(),
            coordinator.clone(),
            tangent_assessor,
            item_summariser.clone(),
            deps.data_channel.clone(),
            deps.clock.clone(),
            config.monitoring_interval_seconds,
        ));

        let lifecycle = Arc::new(Self {
            room_id: room_id.clone(),
            state,
            coordinator: coordinator.clone(),
            data_channel: deps.data_channel.clone(),
            router,
            document_assembler,
            general_reply,
            item_summariser,
            clock: deps.clock,
            bot_name: config.bot_name.clone(),
            override_grace_seconds: config.override_grace_seconds,
            end_requested: AtomicBool::new(false),
        });

        let intro = format!(
            "Hi, I'm {}. I'll help keep us on track with today's agenda.",
            lifecycle.bot_name
        );
        coordinator.dispatch(now, &intro, Trigger::Intro, 0.0, UtteranceSource::Voice).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        Ok((lifecycle, scheduler_task, shutdown_tx))
    }

    /// The single control-loop event dispatch. Runs until a termination
    /// signal fires: an explicit end-meeting event, the channels closing,
    /// or the Monitoring Scheduler finishing (agenda exhausted). Always
    /// ends by invoking the Document Assembler exactly once.
    #[instrument(skip_all, fields(room_id = %self.room_id))]
    pub async fn run(
        self: Arc<Self>,
        mut transcript_rx: mpsc::Receiver<TranscriptEvent>,
        mut control_rx: mpsc::Receiver<ControlEvent>,
        mut scheduler_task: tokio::task::JoinHandle<()>,
        scheduler_shutdown: watch::Sender<bool>,
    ) {
        loop {
            tokio::select! {
                event = transcript_rx.recv() => {
                    match event {
                        Some(event) => self.handle_transcript(event).await,
                        None => {
                            info!("transcript channel closed; ending session");
                            break;
                        }
                    }
                }
                event = control_rx.recv() => {
                    match event {
                        Some(event) => self.handle_control(event).await,
                        None => {
                            info!("control channel closed; ending session");
                            break;
                        }
                    }
                }
                _ = &mut scheduler_task => {
                    info!("monitoring scheduler finished; agenda exhausted");
                    break;
                }
            }

            if self.end_requested.load(Ordering::SeqCst) {
                break;
            }
        }

        let _ = scheduler_shutdown.send(true);
        if !scheduler_task.is_finished() {
            let _ = scheduler_task.await;
        }

        self.finish().await;
    }

    async fn handle_transcript(&self, event: TranscriptEvent) {
        let now = self.clock.now_secs();
        let style = {
            let mut state = self.state.lock().await;
            state.append_transcript(&event.speaker, &event.text, now);
            state.record_participant(&event.speaker, now);
            state.style
        };

        let intent = self.router.classify(&event.text, style);
        self.dispatch_intent(intent, now, UtteranceSource::Voice, &event.text).await;
    }

    async fn handle_control(&self, event: ControlEvent) {
        let now = self.clock.now_secs();
        match event {
            ControlEvent::StyleChange(new_style) => {
                let mut state = self.state.lock().await;
                state.style = new_style;
                info!(style = ?new_style, "facilitation style changed");
            }
            ControlEvent::EndMeeting => {
                self.request_end(now, "explicit end-meeting control event").await;
            }
            ControlEvent::ChatMention { sender, text } => {
                let Some(remaining) = strip_bot_name_prefix(&text, &self.bot_name) else {
                    return;
                };
                info!(sender, "chat mention addressed to the bot");
                let style = { self.state.lock().await.style };
                let intent = self.router.classify(&text, style);
                self.dispatch_intent(intent, now, UtteranceSource::Chat, remaining).await;
            }
        }
    }

    async fn dispatch_intent(&self, intent: Intent, now: u64, source: UtteranceSource, reply_text: &str) {
        match intent {
            Intent::Silence => {
                let mut state = self.state.lock().await;
                state.update_silence_signal(now);
                info!("silence window activated");
            }
            Intent::TimeQuery => {
                let status = { self.state.lock().await.get_time_status(now) };
                let Some(status) = status else { return };
                let total_seconds = (status.remaining_minutes * 60.0).round() as i64;
                let text = if total_seconds > 0 {
                    let minutes = total_seconds / 60;
                    let seconds = total_seconds % 60;
                    format!("About {minutes} minutes {seconds} seconds left on {}.", status.topic)
                } else {
                    format!("We're over time on {}.", status.topic)
                };
                self.coordinator.dispatch(now, &text, Trigger::DirectQuestion, 0.0, source).await;
            }
            Intent::Skip => {
                let completed = {
                    let mut state = self.state.lock().await;
                    let completed_item = state.current_item().cloned();
                    state.advance_to_next(now);
                    completed_item
                };
                self.coordinator.dispatch(now, "Skipping ahead to the next item.", Trigger::Transition, 0.0, source).await;
                if let Some(item) = completed {
                    self.spawn_item_summarisation(item.id, item.topic);
                }
            }
            Intent::End => {
                self.request_end(now, "end-meeting phrase detected").await;
            }
            Intent::Override => {
                {
                    let mut state = self.state.lock().await;
                    state.record_override(now, self.override_grace_seconds);
                }
                self.coordinator.dispatch(now, "Sure, let's take a few more minutes.", Trigger::DirectQuestion, 0.0, source).await;
            }
            Intent::DocumentRequest(request) => {
                let queued = { self.state.lock().await.queue_document_request(request) };
                if queued {
                    self.coordinator
                        .dispatch(now, "Got it, I'll have that ready after the meeting.", Trigger::DirectQuestion, 0.0, source)
                        .await;
                }
            }
            Intent::NamedAddress => {
                self.reply_via_lm(now, reply_text, Trigger::NamedAddress, source).await;
            }
            Intent::General => {
                let chatting = { self.state.lock().await.style == MeetingStyle::Chatting };
                if chatting {
                    self.reply_via_lm(now, reply_text, Trigger::DirectQuestion, source).await;
                }
            }
        }
    }

    async fn reply_via_lm(&self, now: u64, utterance: &str, trigger: Trigger, source: UtteranceSource) {
        let (title, topic, memory) = {
            let state = self.state.lock().await;
            (state.title.clone(), state.current_item().map(|i| i.topic.clone()), state.meeting_memory())
        };

        match self.general_reply.reply(&title, topic.as_deref(), &memory, utterance).await {
            Ok(text) => {
                self.coordinator.dispatch(now, &text, trigger, 0.0, source).await;
            }
            Err(e) => {
                warn!(error = %e, "general reply composer failed; staying silent");
            }
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

    async fn request_end(&self, now: u64, reason: &str) {
        if self.end_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(reason, "ending meeting");
        self.coordinator.dispatch(now, "That wraps up our meeting. Thanks everyone.", Trigger::WrapUp, 0.0, UtteranceSource::Voice).await;
    }

    async fn finish(&self) {
        let now = self.clock.now_secs();
        let ended = serde_json::json!({ "type": "meeting_ended" });
        if let Err(e) = self.data_channel.publish("agenda", ended).await {
            warn!(error = %e, "failed to publish meeting_ended signal");
        }

        let state = self.state.lock().await;
        if let Err(e) = self.document_assembler.assemble(&self.room_id, &state, now).await {
            warn!(error = %e, "document assembly failed");
        }
    }
}

/// Polls the participant registry until someone joins or `timeout` lapses.
async fn wait_for_first_participant(
    registry: &dyn ParticipantRegistry,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<String> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let identities =
            registry.current_identities().await.map_err(|e| SessionError::Connect(e.to_string()))?;
        if let Some(identity) = identities.into_iter().next() {
            return Ok(identity);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(SessionError::NoParticipantJoined);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

fn strip_bot_name_prefix<'a>(text: &'a str, bot_name: &str) -> Option<&'a str> {
    let trimmed = text.trim_start().trim_start_matches('@');
    if trimmed.len() < bot_name.len() || !trimmed[..bot_name.len()].eq_ignore_ascii_case(bot_name) {
        return None;
    }
    Some(trimmed[bot_name.len()..].trim_start_matches([',', ':', ' ']).trim())
}

impl From<facilitator_router::RouterError> for SessionError {
    fn from(e: facilitator_router::RouterError) -> Self {
        SessionError::MalformedField { field: "bot_name", reason: e.to_string() }
    }
}
