//! Agent runtime: a hosted LLM plus the mail/calendar tool registry.
//!
//! Reasoning is delegated entirely to the model; this layer sends the
//! conversation with tool specs, executes requested tool calls, and loops
//! until the model answers in plain text.

pub mod llm;
pub mod tools;

use self::llm::{ChatClient, ChatMessage};
use self::tools::ToolRegistry;

/// Hard cap on model/tool rounds per run.
const MAX_TOOL_ROUNDS: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model returned no choices")]
    EmptyResponse,
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("agent exceeded {0} tool rounds")]
    RoundLimit(usize),
    #[error(transparent)]
    Connector(#[from] crate::connectors::ConnectorError),
}

/// An agent: a name and its standing instructions. Tools come from the
/// registry passed to `run`.
pub struct Agent {
    pub name: &'static str,
    pub instructions: String,
}

impl Agent {
    pub fn new(name: &'static str, instructions: String) -> Self {
        Self { name, instructions }
    }

    /// Run to completion: execute tool calls as the model requests them,
    /// returning the first plain-text answer. Tool failures propagate
    /// unchanged; the caller (or the engine above it) decides what to do.
    pub async fn run(
        &self,
        client: &ChatClient,
        registry: &ToolRegistry,
        user_prompt: &str,
    ) -> Result<String, AgentError> {
        let specs = registry.specs();
        let mut messages = vec![
            ChatMessage::system(&self.instructions),
            ChatMessage::user(user_prompt),
        ];

        for _ in 0..MAX_TOOL_ROUNDS {
            let reply = client.complete(&messages, &specs).await?;

            if reply.tool_calls.is_empty() {
                return Ok(reply.content.unwrap_or_default());
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                log::info!(
                    "{}: tool {}({})",
                    self.name,
                    call.function.name,
                    call.function.arguments
                );
                let result = registry
                    .dispatch(&call.function.name, &call.function.arguments)
                    .await?;
                messages.push(ChatMessage::tool_result(&call.id, result.to_string()));
            }
        }

        log::error!("{} hit the tool round limit", self.name);
        Err(AgentError::RoundLimit(MAX_TOOL_ROUNDS))
    }
}
