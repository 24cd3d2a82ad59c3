use std::collections::HashMap;

use facilitator_core::config::{FacilitatorConfig, TangentThresholds};
use facilitator_core::{
    AgendaItem, DocumentRequest, ItemState, MeetingContext, MeetingStyle, ParticipantInfo,
    TimeStatus, TranscriptEntry,
};
use tracing::{debug, trace};

use crate::style::StyleProfile;

/// Outcome of a single `check_time_state` poll. Only the forward transitions
/// that actually happened this call are reported; a tick that finds nothing
/// new returns `NoChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    EnteredWarning,
    EnteredOvertime,
}

/// All engine-owned state for one meeting, and the only thing that is
/// allowed to mutate an `AgendaItem`'s lifecycle. Everything here is in
/// memory only — restart loses it, per the Non-goal on persistence.
#[derive(Debug, Clone)]
pub struct MeetingState {
    pub title: String,
    pub items: Vec<AgendaItem>,
    pub style: MeetingStyle,
    pub meeting_start: Option<u64>,
    current_item_index: Option<usize>,
    accumulated_overtime_secs: u64,

    transcript: Vec<TranscriptEntry>,
    item_transcripts: HashMap<u32, Vec<TranscriptEntry>>,
    pub participants: HashMap<String, ParticipantInfo>,

    last_intervention_at: Option<u64>,
    silence_until: Option<u64>,
    override_until: Option<u64>,

    document_requests: Vec<DocumentRequest>,

    cooldown_secs: u64,
    silence_window_secs: u64,
    transcript_window_secs: u64,
    warning_ratio: f64,
    tangent_thresholds: TangentThresholds,
}

impl MeetingState {
    pub fn new(
        title: impl Into<String>,
        items: Vec<AgendaItem>,
        style: MeetingStyle,
        config: &FacilitatorConfig,
    ) -> Self {
        Self {
            title: title.into(),
            items,
            style,
            meeting_start: None,
            current_item_index: None,
            accumulated_overtime_secs: 0,
            transcript: Vec::new(),
            item_transcripts: HashMap::new(),
            participants: HashMap::new(),
            last_intervention_at: None,
            silence_until: None,
            override_until: None,
            document_requests: Vec::new(),
            cooldown_secs: config.intervention_cooldown_seconds,
            silence_window_secs: config.silence_window_seconds,
            transcript_window_secs: config.transcript_window_seconds,
            warning_ratio: config.warning_ratio,
            tangent_thresholds: config.tangent_confidence_thresholds.clone(),
        }
    }

    pub fn style_profile(&self) -> StyleProfile {
        StyleProfile::for_style(self.style, &self.tangent_thresholds)
    }

    pub fn current_item(&self) -> Option<&AgendaItem> {
        self.current_item_index.map(|idx| &self.items[idx])
    }

    fn current_item_mut(&mut self) -> Option<&mut AgendaItem> {
        let idx = self.current_item_index?;
        Some(&mut self.items[idx])
    }

    pub fn is_exhausted(&self) -> bool {
        self.meeting_start.is_some()
            && self.current_item_index.is_none()
            && self.items.iter().all(|i| i.state == ItemState::Completed)
    }

    /// Starts the meeting clock and activates the first item. No-op (returns
    /// `false`) if already started or the agenda is empty.
    pub fn start_meeting(&mut self, now: u64) -> bool {
        if self.meeting_start.is_some() || self.items.is_empty() {
            return false;
        }
        self.meeting_start = Some(now);
        self.advance_to_next(now);
        true
    }

    /// Completes the current item (if any) and activates the next `Upcoming`
    /// one. Returns the newly active item, or `None` once the agenda is
    /// exhausted.
    pub fn advance_to_next(&mut self, now: u64) -> Option<&AgendaItem> {
        if let Some(idx) = self.current_item_index.take() {
            let allocated_secs = self.items[idx].allocated_secs();
            let elapsed = self.items[idx]
                .started_at
                .map(|started| now.saturating_sub(started))
                .unwrap_or(0);
            self.items[idx].actual_elapsed_secs = elapsed;
            self.items[idx].state = ItemState::Completed;
            self.accumulated_overtime_secs += elapsed.saturating_sub(allocated_secs);
        }

        let next_idx = self
            .items
            .iter()
            .position(|item| item.state == ItemState::Upcoming);

        match next_idx {
            Some(idx) => {
                self.items[idx].state = ItemState::Active;
                self.items[idx].started_at = Some(now);
                self.current_item_index = Some(idx);
                debug!(item_id = self.items[idx].id, topic = %self.items[idx].topic, "advanced to item");
                Some(&self.items[idx])
            }
            None => {
                self.current_item_index = None;
                None
            }
        }
    }

    /// Polls the current item's elapsed time against its allocation and
    /// advances its lifecycle state as needed. Called once per monitoring
    /// tick; idempotent within a tick (calling twice with the same `now`
    /// reports `NoChange` the second time).
    pub fn check_time_state(&mut self, now: u64) -> Transition {
        let warning_ratio = self.warning_ratio;
        let override_until = self.override_until;
        let Some(item) = self.current_item_mut() else {
            return Transition::NoChange;
        };
        let Some(started_at) = item.started_at else {
            return Transition::NoChange;
        };
        let elapsed = now.saturating_sub(started_at);
        let allocated = item.allocated_secs();
        let warning_at = (allocated as f64 * warning_ratio) as u64;

        match item.state {
            ItemState::Active if elapsed >= allocated => {
                item.state = ItemState::Overtime;
                Transition::EnteredOvertime
            }
            ItemState::Active if elapsed >= warning_at => {
                item.state = ItemState::Warning;
                Transition::EnteredWarning
            }
            ItemState::Warning | ItemState::Overtime if elapsed >= allocated => {
                item.state = ItemState::Overtime;
                Transition::EnteredOvertime
            }
            ItemState::Extended if override_until.is_some_and(|until| now > until) => {
                item.state = ItemState::Overtime;
                Transition::EnteredOvertime
            }
            _ => Transition::NoChange,
        }
    }

    /// Grants extra time for the current item in response to a participant
    /// override ("give us five more minutes"). Only moves the item's
    /// lifecycle state (`Overtime -> Extended`) if it was actually overtime;
    /// otherwise it just arms the override exemption window used by the gate.
    /// The grace period lives entirely in `override_until`; the item's own
    /// allocation is left untouched so `check_time_state` re-enters
    /// `Overtime` the moment the window closes.
    pub fn record_override(&mut self, now: u64, grace_seconds: u64) {
        self.override_until = Some(now + grace_seconds);
        if let Some(item) = self.current_item_mut() {
            if item.state == ItemState::Overtime {
                item.state = ItemState::Extended;
            }
        }
    }

    pub fn record_intervention(&mut self, now: u64) {
        self.last_intervention_at = Some(now);
    }

    fn is_override_active(&self, now: u64) -> bool {
        self.override_until.is_some_and(|until| now < until)
    }

    fn is_silence_active(&self, now: u64) -> bool {
        self.silence_until.is_some_and(|until| now < until)
    }

    /// Whether the intervention cooldown has elapsed. `Intro`, `WrapUp`, and
    /// `Transition` speech points bypass this check at the call site; every
    /// other trigger must clear it.
    pub fn cooldown_ok(&self, now: u64) -> bool {
        match self.last_intervention_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.cooldown_secs,
        }
    }

    /// Whether it is even worth invoking the Tangent Assessor right now.
    /// `false` for `chatting` style (tangent checks never fire), before the
    /// style-specific tangent tolerance has elapsed since the last
    /// intervention (gentle 120s, moderate 60s — distinct from the general
    /// 30s intervention cooldown), or while an override or silence window
    /// is active.
    pub fn can_intervene_for_tangent(&self, now: u64) -> bool {
        let profile = self.style_profile();
        let Some(tolerance_secs) = profile.tangent_tolerance_secs else {
            return false;
        };

        let tolerance_ok = match self.last_intervention_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= tolerance_secs,
        };

        tolerance_ok && !self.is_override_active(now) && !self.is_silence_active(now)
    }

    /// Deterministic answer to "how much time is left" — no LM involved.
    pub fn get_time_status(&self, now: u64) -> Option<TimeStatus> {
        let item = self.current_item()?;
        let started_at = item.started_at?;
        let meeting_start = self.meeting_start?;

        let elapsed_secs = now.saturating_sub(started_at);
        let elapsed_minutes = elapsed_secs as f64 / 60.0;
        let remaining_minutes = (item.allocated_minutes - elapsed_minutes).max(0.0);
        let total_meeting_minutes = now.saturating_sub(meeting_start) as f64 / 60.0;
        let current_overtime_secs = elapsed_secs.saturating_sub(item.allocated_secs());
        let meeting_overtime_minutes =
            (self.accumulated_overtime_secs + current_overtime_secs) as f64 / 60.0;

        Some(TimeStatus {
            topic: item.topic.clone(),
            elapsed_minutes,
            remaining_minutes,
            allocated_minutes: item.allocated_minutes,
            total_meeting_minutes,
            meeting_overtime_minutes,
        })
    }

    /// Builds a read-only snapshot for the Speech Gate. `tangent_confidence`
    /// is 0.0 unless this evaluation follows a Tangent Assessor call.
    pub fn build_context(&self, now: u64, tangent_confidence: f64) -> MeetingContext {
        let item = self.current_item();
        let time_status = self.get_time_status(now);

        let recent_transcript = self
            .transcript
            .iter()
            .rev()
            .take_while(|entry| now.saturating_sub(entry.timestamp) <= 60)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        MeetingContext {
            style: self.style,
            current_topic: item.map(|i| i.topic.clone()),
            current_item_state: item.map(|i| i.state),
            elapsed_minutes: time_status.as_ref().map(|t| t.elapsed_minutes).unwrap_or(0.0),
            allocated_minutes: time_status.as_ref().map(|t| t.allocated_minutes).unwrap_or(0.0),
            meeting_overtime_minutes: time_status
                .as_ref()
                .map(|t| t.meeting_overtime_minutes)
                .unwrap_or(self.accumulated_overtime_secs as f64 / 60.0),
            recent_transcript,
            override_active: self.is_override_active(now),
            silence_active: self.is_silence_active(now),
            tangent_confidence,
            tangent_threshold: self.style_profile().tangent_threshold.unwrap_or(0.0),
            items_remaining: self
                .items
                .iter()
                .filter(|i| i.state != ItemState::Completed)
                .count(),
        }
    }

    /// Arms a silence window: the facilitator stays quiet (beyond hard
    /// exemptions in the gate) until it elapses.
    pub fn update_silence_signal(&mut self, now: u64) {
        self.silence_until = Some(now + self.silence_window_secs);
        trace!(until = now + self.silence_window_secs, "silence window armed");
    }

    /// Appends an utterance to the rolling transcript window and, if an item
    /// is current, to that item's running transcript for the summariser.
    pub fn append_transcript(&mut self, speaker: impl Into<String>, text: impl Into<String>, now: u64) {
        let entry = TranscriptEntry { speaker: speaker.into(), text: text.into(), timestamp: now };

        if let Some(item) = self.current_item() {
            self.item_transcripts.entry(item.id).or_default().push(entry.clone());
        }

        self.transcript.push(entry);
        let window = self.transcript_window_secs;
        self.transcript.retain(|e| now.saturating_sub(e.timestamp) <= window);
    }

    /// Utterances recorded while `item_id` was the current item. Drained by
    /// the Item Summariser when an item completes.
    pub fn item_transcript(&self, item_id: u32) -> &[TranscriptEntry] {
        self.item_transcripts.get(&item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_participant(&mut self, identity: impl Into<String>, now: u64) {
        let identity = identity.into();
        self.participants
            .entry(identity)
            .and_modify(|p| p.last_seen = now)
            .or_insert(ParticipantInfo { first_seen: now, last_seen: now });
    }

    /// Queues a document request, deduplicated by slug. Returns `false` if
    /// an identical slug was already queued.
    pub fn queue_document_request(&mut self, req: DocumentRequest) -> bool {
        if self.document_requests.iter().any(|r| r.slug == req.slug) {
            return false;
        }
        self.document_requests.push(req);
        true
    }

    pub fn document_requests(&self) -> &[DocumentRequest] {
        &self.document_requests
    }

    pub fn current_item_index(&self) -> Option<usize> {
        self.current_item_index
    }

    /// Attaches Item Summariser output to a completed item. A no-op if the
    /// id no longer exists (it always will — ids are never reused).
    pub fn attach_notes(&mut self, item_id: u32, notes: facilitator_core::ItemNotes) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.notes = Some(notes);
        }
    }

    /// Renders completed items' notes into the "meeting memory" blob
    /// injected into the facilitator's system prompt and into Custom
    /// document generation.
    pub fn meeting_memory(&self) -> String {
        let mut memory = String::new();
        for item in self.items.iter().filter(|i| i.state == ItemState::Completed) {
            let Some(notes) = &item.notes else { continue };
            if notes.is_empty() {
                continue;
            }
            memory.push_str(&format!("## {}\n", item.topic));
            for point in &notes.key_points {
                memory.push_str(&format!("- {point}\n"));
            }
            for decision in &notes.decisions {
                memory.push_str(&format!("- Decision: {decision}\n"));
            }
            for action in &notes.action_items {
                memory.push_str(&format!("- Action: {action}\n"));
            }
        }
        memory
    }

    /// JSON snapshot published on the `agenda` data channel.
    pub fn snapshot(&self, now: u64) -> serde_json::Value {
        let time_status = self.get_time_status(now);
        serde_json::json!({
            "type": "agenda_state",
            "current_item_index": self.current_item_index,
            "items": self.items.iter().map(|item| serde_json::json!({
                "id": item.id,
                "topic": item.topic,
                "duration_minutes": item.allocated_minutes,
                "state": item.state,
                "actual_elapsed": item.actual_elapsed_secs,
            })).collect::<Vec<_>>(),
            "elapsed_minutes": time_status.as_ref().map(|t| t.elapsed_minutes).unwrap_or(0.0),
            "meeting_overtime": time_status.as_ref().map(|t| t.meeting_overtime_minutes)
                .unwrap_or(self.accumulated_overtime_secs as f64 / 60.0),
            "total_meeting_minutes": time_status.as_ref().map(|t| t.total_meeting_minutes).unwrap_or(0.0),
            "style": self.style,
            "meeting_notes": self.meeting_memory(),
        })
    }
}

#[cfg(test)]
mod tests {
    use facilitator_core::{AgendaItem, DocumentType};

    use super::*;

    fn state_with(items: Vec<AgendaItem>, style: MeetingStyle) -> MeetingState {
        MeetingState::new("Standup", items, style, &FacilitatorConfig::default())
    }

    fn sample_items() -> Vec<AgendaItem> {
        vec![
            AgendaItem::new(1, "Opening", 10.0),
            AgendaItem::new(2, "Deep dive", 20.0),
        ]
    }

    #[test]
    fn start_meeting_activates_first_item() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        assert!(state.start_meeting(1_000));
        assert!(!state.start_meeting(1_010), "second start must no-op");

        let current = state.current_item().unwrap();
        assert_eq!(current.id, 1);
        assert_eq!(current.state, ItemState::Active);
        assert_eq!(current.started_at, Some(1_000));
    }

    #[test]
    fn warning_fires_at_exactly_the_configured_ratio() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);

        // 10 minute item, 0.80 ratio => warning at 480s.
        assert_eq!(state.check_time_state(479), Transition::NoChange);
        assert_eq!(state.check_time_state(480), Transition::EnteredWarning);
        assert_eq!(state.current_item().unwrap().state, ItemState::Warning);
    }

    #[test]
    fn overtime_fires_at_exact_allocation_and_skips_warning_if_missed() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);

        // Jump straight past both thresholds in one tick.
        assert_eq!(state.check_time_state(600), Transition::EnteredOvertime);
        assert_eq!(state.current_item().unwrap().state, ItemState::Overtime);
    }

    #[test]
    fn override_extends_an_overtime_item_into_extended_without_touching_allocation() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.check_time_state(600);
        assert_eq!(state.current_item().unwrap().state, ItemState::Overtime);

        state.record_override(600, 120);
        let item = state.current_item().unwrap();
        assert_eq!(item.state, ItemState::Extended);
        assert_eq!(item.allocated_minutes, 10.0);
    }

    #[test]
    fn extended_item_re_enters_overtime_once_the_override_window_closes() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.check_time_state(600);
        state.record_override(600, 120);
        assert_eq!(state.current_item().unwrap().state, ItemState::Extended);

        assert_eq!(state.check_time_state(719), Transition::NoChange);
        assert_eq!(state.check_time_state(721), Transition::EnteredOvertime);
        assert_eq!(state.current_item().unwrap().state, ItemState::Overtime);
    }

    #[test]
    fn overtime_item_keeps_re_emitting_entered_overtime_each_tick() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        assert_eq!(state.check_time_state(600), Transition::EnteredOvertime);
        assert_eq!(state.check_time_state(650), Transition::EnteredOvertime);
        assert_eq!(state.current_item().unwrap().state, ItemState::Overtime);
    }

    #[test]
    fn advance_to_next_completes_current_and_activates_next() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        let next = state.advance_to_next(650).cloned();
        assert_eq!(next.unwrap().id, 2);

        let first = &state.items[0];
        assert_eq!(first.state, ItemState::Completed);
        assert_eq!(first.actual_elapsed_secs, 650);
    }

    #[test]
    fn advance_past_last_item_exhausts_agenda() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.advance_to_next(600);
        assert!(state.advance_to_next(1_800).is_none());
        assert!(state.is_exhausted());
    }

    #[test]
    fn cooldown_blocks_reintervention_until_elapsed() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.record_intervention(100);
        assert!(!state.cooldown_ok(110));
        assert!(state.cooldown_ok(130));
    }

    #[test]
    fn chatting_style_never_enables_tangent_checks() {
        let mut state = state_with(sample_items(), MeetingStyle::Chatting);
        state.start_meeting(0);
        assert!(!state.can_intervene_for_tangent(1_000));
    }

    #[test]
    fn silence_window_suppresses_tangent_checks() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.update_silence_signal(100);
        assert!(!state.can_intervene_for_tangent(200));
        assert!(state.can_intervene_for_tangent(401));
    }

    #[test]
    fn document_requests_dedupe_by_slug() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        let req = DocumentRequest {
            doc_type: DocumentType::Summary,
            description: "wrap it up".into(),
            slug: "summary".into(),
        };
        assert!(state.queue_document_request(req.clone()));
        assert!(!state.queue_document_request(req));
        assert_eq!(state.document_requests().len(), 1);
    }

    #[test]
    fn recent_transcript_excludes_entries_older_than_sixty_seconds() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.append_transcript("alice", "old line", 0);
        state.append_transcript("bob", "fresh line", 90);

        let ctx = state.build_context(100, 0.0);
        assert_eq!(ctx.recent_transcript.len(), 1);
        assert_eq!(ctx.recent_transcript[0].speaker, "bob");
    }

    #[test]
    fn item_transcript_is_scoped_to_the_active_item_at_append_time() {
        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.append_transcript("alice", "about item one", 10);
        state.advance_to_next(600);
        state.append_transcript("bob", "about item two", 700);

        assert_eq!(state.item_transcript(1).len(), 1);
        assert_eq!(state.item_transcript(2).len(), 1);
        assert_eq!(state.item_transcript(1)[0].text, "about item one");
    }

    #[test]
    fn meeting_memory_includes_only_completed_items_with_notes() {
        use facilitator_core::ItemNotes;

        let mut state = state_with(sample_items(), MeetingStyle::Moderate);
        state.start_meeting(0);
        state.advance_to_next(600);
        state.attach_notes(
            1,
            ItemNotes {
                key_points: vec!["discussed the budget".to_string()],
                decisions: vec!["approved".to_string()],
                action_items: vec![],
            },
        );

        let memory = state.meeting_memory();
        assert!(memory.contains("Opening"));
        assert!(memory.contains("approved"));
        assert!(!memory.contains("Deep dive"), "item 2 is still active, not completed");
    }

    #[test]
    fn snapshot_reports_current_item_index_and_style() {
        let mut state = state_with(sample_items(), MeetingStyle::Gentle);
        state.start_meeting(0);
        let snapshot = state.snapshot(30);
        assert_eq!(snapshot["current_item_index"], serde_json::json!(0));
        assert_eq!(snapshot["style"], serde_json::json!("gentle"));
    }
}
