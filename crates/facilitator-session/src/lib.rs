//! Session Lifecycle: the per-room entry point tying every other crate
//! together into one running meeting.

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod metadata;

pub use error::{Result, SessionError};
pub use events::{ControlEvent, TranscriptEvent};
pub use lifecycle::{SessionDependencies, SessionLifecycle};
pub use metadata::{parse_room_metadata, RoomMetadata};
