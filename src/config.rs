//! Environment configuration.
//!
//! Values are read and presence-checked at the point of use; nothing is
//! validated beyond that.

use crate::agent::AgentError;
use crate::connectors::ConnectorError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Hostname of the connector registry.
pub fn connectors_hostname() -> Result<String, ConnectorError> {
    non_empty_var("REPLIT_CONNECTORS_HOSTNAME").ok_or_else(|| {
        ConnectorError::Configuration("REPLIT_CONNECTORS_HOSTNAME is not set".to_string())
    })
}

/// Registry auth header value, derived from one of two mutually exclusive
/// identity sources: the ambient repl identity, or the renewal credential.
pub fn registry_auth_token() -> Result<String, ConnectorError> {
    if let Some(identity) = non_empty_var("REPL_IDENTITY") {
        return Ok(format!("repl {}", identity));
    }
    if let Some(renewal) = non_empty_var("WEB_REPL_RENEWAL") {
        return Ok(format!("depl {}", renewal));
    }
    Err(ConnectorError::Configuration(
        "neither REPL_IDENTITY nor WEB_REPL_RENEWAL is set".to_string(),
    ))
}

/// Base URL of the model provider's OpenAI-compatible API.
pub fn model_base_url() -> String {
    non_empty_var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string())
}

pub fn model_api_key() -> Result<String, AgentError> {
    non_empty_var("OPENAI_API_KEY")
        .ok_or_else(|| AgentError::Configuration("OPENAI_API_KEY is not set".to_string()))
}

pub fn model_name() -> String {
    non_empty_var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string())
}
