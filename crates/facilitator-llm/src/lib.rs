//! LM integration: the two call shapes the facilitator needs (a fast
//! tool-calling path and a large streaming chat path) and the three
//! components built on top of them.
//!
//! Grounded on `skynet-agent::provider` for the request/response shapes and
//! the provider trait split, and on `skynet-agent::anthropic` /
//! `anthropic_stream` for a concrete HTTP-backed implementation of each.

pub mod document;
pub mod error;
pub mod fast_path;
pub mod large_path;
pub mod reply;
pub mod summariser;
pub mod tangent;
pub mod types;

pub use document::CustomDocumentComposer;
pub use error::LlmError;
pub use fast_path::{AnthropicFastPath, FastPathLlm};
pub use large_path::{AnthropicLargePath, LargePathLlm};
pub use reply::GeneralReplyComposer;
pub use summariser::ItemSummariser;
pub use tangent::{TangentAssessment, TangentAssessor, TangentClassification};
pub use types::{ChatRequest, ChatResponse, Message, Role, StreamEvent, ToolCall, ToolDefinition};
