use thiserror::Error;

/// Invariant violations in agenda progression. These never arise from normal
/// operation — every state machine method is written to no-op instead of
/// reaching an invalid state — but callers that want to assert the invariants
/// in tests or logging can match on this.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgendaError {
    #[error("meeting already started")]
    AlreadyStarted,

    #[error("meeting has no agenda items")]
    EmptyAgenda,

    #[error("no current item to advance past")]
    NoCurrentItem,
}
