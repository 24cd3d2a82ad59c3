//! The Agenda State Machine: item progression, timing, and the derived
//! snapshots (`TimeStatus`, `MeetingContext`) the rest of the engine reads.
//!
//! Grounded on `skynet-scheduler`'s separation of a typed state (`Job`) from
//! the logic that advances it, and on `skynet-sessions::manager` for the
//! "build a snapshot, never hand out a raw mutable reference across an
//! await point" discipline — here applied to an in-memory struct instead of
//! a SQLite row, per the Non-goal on cross-restart persistence.

pub mod error;
pub mod state;
pub mod style;

pub use error::AgendaError;
pub use state::{MeetingState, Transition};
pub use style::StyleProfile;
