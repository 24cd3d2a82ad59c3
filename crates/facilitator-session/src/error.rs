use thiserror::Error;

/// Fatal conditions at the Session Lifecycle's top-level stages.
///
/// Unlike every other crate's error enum, a `SessionError` is allowed to
/// actually terminate the session — it is the one boundary in the engine
/// where an error is not a logged no-op. See SPEC_FULL.md's error-handling
/// design: `TransientExternal` everywhere else, `Fatal` only here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to room: {0}")]
    Connect(String),

    #[error("no participant joined before the wait timeout")]
    NoParticipantJoined,

    #[error("room metadata missing required field: {0}")]
    MissingField(&'static str),

    #[error("room metadata field {field} was malformed: {reason}")]
    MalformedField { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;
