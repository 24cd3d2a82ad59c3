use serde::{Deserialize, Serialize};

/// A single message in a chat-style LM request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Tool definition sent to the LM for the fast tool-calling path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool invocation the LM chose to make.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: serde_json::Value,
}

/// Request shape shared by both LM paths.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    /// Present (and forced) on fast-path requests; empty on large-path ones.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>) -> Self {
        Self { model: model.into(), system: system.into(), messages: Vec::new(), max_tokens: 1024, tools: Vec::new() }
    }

    pub fn with_user_message(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message { role: Role::User, content: text.into() });
        self
    }

    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from the fast tool-calling path. `tool_call` is `None` if the
/// model replied with plain text instead of invoking the forced tool.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_call: Option<ToolCall>,
}

pub(crate) fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Events emitted while streaming the large chat path.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta { text: String },
    Done,
    Error { message: String },
}
