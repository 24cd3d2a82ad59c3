//! Command Router: classifies a participant utterance into a fixed intent
//! set before any LM is ever consulted.
//!
//! Grounded on `sven_tools::policy::ToolPolicy` for the "compile patterns
//! once, decide by first match in an ordered list" shape, generalized from
//! glob patterns to phrase lists and a named-address regex.

pub mod error;
pub mod intent;
pub mod router;

pub use error::RouterError;
pub use intent::Intent;
pub use router::CommandRouter;
