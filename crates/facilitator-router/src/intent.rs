use facilitator_core::DocumentRequest;

/// Outcome of classifying a single participant utterance.
///
/// `General` covers two distinct situations the caller must disambiguate by
/// style: in `chatting` style it means "send to the LM"; in any other style
/// it means "not directed at the bot — no action, no LM call" (see the
/// gating rule on `CommandRouter::classify`).
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Arms a silence window; produces no spoken reply.
    Silence,
    /// Addressed directly, but none of the structured commands matched —
    /// a freeform question for the LM to answer.
    NamedAddress,
    /// Deterministic reply from `MeetingState::get_time_status`, no LM call.
    TimeQuery,
    /// Advance the agenda immediately.
    Skip,
    /// Trigger the end-of-meeting pipeline.
    End,
    /// Grant the current item a grace period.
    Override,
    /// Queue a post-meeting document.
    DocumentRequest(DocumentRequest),
    General,
}
