use thiserror::Error;

/// Every variant here is handled by the caller as a documented no-op —
/// per the error-handling design, an `LlmError` never propagates past the
/// Tangent Assessor, Item Summariser, or Custom Document composer boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LM call exceeded its {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned an error response: {0}")]
    Api(String),

    #[error("response did not match the expected schema: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
