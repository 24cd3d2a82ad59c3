use serde::{Deserialize, Serialize};

/// Facilitation tone. Drives intervention cadence and tangent thresholds —
/// see `facilitator-agenda::style` for the per-style numbers table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStyle {
    Gentle,
    Moderate,
    Chatting,
}

impl Default for MeetingStyle {
    fn default() -> Self {
        MeetingStyle::Moderate
    }
}

/// Lifecycle state of a single agenda item.
///
/// Monotonic except `Overtime -> Extended` (an override grants more time)
/// and `Extended -> Completed` (advance after the grace period lapses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Upcoming,
    Active,
    Warning,
    Overtime,
    Extended,
    Completed,
}

impl ItemState {
    /// True for the states that count as "the current item" — at most one
    /// item may be in one of these at any instant.
    pub fn is_current(self) -> bool {
        matches!(
            self,
            ItemState::Active | ItemState::Warning | ItemState::Overtime | ItemState::Extended
        )
    }
}

/// Key points, decisions, and action items captured by the Item Summariser.
/// Attached to an item exactly once, on completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemNotes {
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<String>,
}

impl ItemNotes {
    pub fn is_empty(&self) -> bool {
        self.key_points.is_empty() && self.decisions.is_empty() && self.action_items.is_empty()
    }
}

/// One time-boxed topic in the meeting plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaItem {
    /// Stable ordinal, assigned at agenda parse time; never reused.
    pub id: u32,
    pub topic: String,
    pub allocated_minutes: f64,
    pub state: ItemState,
    /// Seconds (clock time) at which the item entered `Active`.
    pub started_at: Option<u64>,
    /// Total seconds accumulated while the item was in a current state.
    pub actual_elapsed_secs: u64,
    pub notes: Option<ItemNotes>,
}

impl AgendaItem {
    pub fn new(id: u32, topic: impl Into<String>, allocated_minutes: f64) -> Self {
        Self {
            id,
            topic: topic.into(),
            allocated_minutes,
            state: ItemState::Upcoming,
            started_at: None,
            actual_elapsed_secs: 0,
            notes: None,
        }
    }

    pub fn allocated_secs(&self) -> u64 {
        (self.allocated_minutes * 60.0) as u64
    }
}

/// A single attributed utterance, ordered by arrival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub text: String,
    /// Seconds (clock time) at which the entry was appended.
    pub timestamp: u64,
}

/// First/last-seen bookkeeping for a single participant identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub first_seen: u64,
    pub last_seen: u64,
}

/// Deterministic answer to a time query — never touches the LM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeStatus {
    pub topic: String,
    pub elapsed_minutes: f64,
    /// Clamped to >= 0.
    pub remaining_minutes: f64,
    pub allocated_minutes: f64,
    pub total_meeting_minutes: f64,
    /// Finalised overtime from past items plus the current item's overrun.
    pub meeting_overtime_minutes: f64,
}

/// The reason a candidate utterance exists. Determines which Speech Gate
/// rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Intro,
    TimeWarning,
    Tangent,
    Transition,
    WrapUp,
    DirectQuestion,
    NamedAddress,
}

/// What the Speech Gate decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    Speak,
    Silent,
}

/// Output of a single Speech Gate evaluation. Produced fresh every call;
/// carries no side effects of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub action: GateAction,
    /// Empty when `action == Silent`.
    pub text: String,
    /// Short machine-readable reason, e.g. "redundancy", "silence", "chatting mode".
    pub reason: &'static str,
    pub confidence: f64,
    pub trigger: Trigger,
}

impl GateResult {
    pub fn speak(text: impl Into<String>, reason: &'static str, confidence: f64, trigger: Trigger) -> Self {
        Self { action: GateAction::Speak, text: text.into(), reason, confidence, trigger }
    }

    pub fn silent(reason: &'static str, confidence: f64, trigger: Trigger) -> Self {
        Self { action: GateAction::Silent, text: String::new(), reason, confidence, trigger }
    }

    pub fn is_speak(&self) -> bool {
        self.action == GateAction::Speak
    }
}

/// Derived, read-only snapshot handed to the Speech Gate. Built fresh by
/// the Agenda State Machine for every evaluation — never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingContext {
    pub style: MeetingStyle,
    pub current_topic: Option<String>,
    pub current_item_state: Option<ItemState>,
    pub elapsed_minutes: f64,
    pub allocated_minutes: f64,
    pub meeting_overtime_minutes: f64,
    /// Utterances from the last 60 seconds only.
    pub recent_transcript: Vec<TranscriptEntry>,
    pub override_active: bool,
    /// Whether a silence window (participant-requested mute) is currently active.
    pub silence_active: bool,
    /// 0.0 when no tangent assessment is in play for this evaluation.
    pub tangent_confidence: f64,
    /// Confidence the Tangent Assessor must clear for this style, resolved
    /// ahead of time so the gate stays a pure function of exactly these
    /// three arguments. Meaningless in `chatting` style (never consulted —
    /// chatting mode is decided before the gate reaches the tangent rule).
    pub tangent_threshold: f64,
    pub items_remaining: usize,
}

/// Kind of document the Document Assembler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Attendance,
    ActionItems,
    Summary,
    Custom,
}

/// A queued request for a post-meeting document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub doc_type: DocumentType,
    /// Free-form description; used as the LM prompt hint for `Custom`.
    pub description: String,
    /// Lowercase, hyphenated filename stem. Requests are deduplicated by this.
    pub slug: String,
}

/// A finished document ready for delivery to the external document sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub filename: String,
    pub markdown: String,
}
