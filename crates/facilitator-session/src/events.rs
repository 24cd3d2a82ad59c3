use facilitator_core::MeetingStyle;

/// One transcript event delivered by the external speech-input handler.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub speaker: String,
    pub text: String,
}

/// Control-channel events the Session Lifecycle reacts to, per §6.3.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    StyleChange(MeetingStyle),
    EndMeeting,
    ChatMention { sender: String, text: String },
}
