use thiserror::Error;

/// Errors surfaced by the six external collaborator interfaces (§6.1).
///
/// Every one of these is a `TransientExternal` in the error-handling design:
/// callers log it and fall back to the documented no-op, they never
/// propagate it past the component boundary that made the call.
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("TTS sink error: {0}")]
    Tts(String),

    #[error("data channel error: {0}")]
    DataChannel(String),

    #[error("participant registry error: {0}")]
    Participant(String),

    #[error("document sink error: {0}")]
    Document(String),

    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },
}

pub type Result<T> = std::result::Result<T, ExternalError>;
