//! Agent tools: one per remote operation wrapper.
//!
//! Each tool is a direct mapping onto a single mail or calendar call.
//! Dispatch acquires a fresh client handle through the token cache,
//! performs the operation, and returns its fixed output shape as JSON.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::llm::ToolSpec;
use super::AgentError;
use crate::connectors::calendar::{CalendarClient, EventInput};
use crate::connectors::gmail::GmailClient;
use crate::connectors::token_cache::TokenCache;

// ============================================================================
// Tool argument shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesArgs {
    #[serde(default)]
    max_results: Option<u32>,
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetMessageArgs {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LabelArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddLabelArgs {
    message_id: String,
    label_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateDraftArgs {
    to: String,
    subject: String,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEventsArgs {
    #[serde(default)]
    max_results: Option<u32>,
    #[serde(default)]
    time_min: Option<DateTime<Utc>>,
}

// ============================================================================
// Registry
// ============================================================================

/// The tool set exposed to the agent, closed over the token cache.
pub struct ToolRegistry {
    cache: Arc<TokenCache>,
}

impl ToolRegistry {
    pub fn new(cache: Arc<TokenCache>) -> Self {
        Self { cache }
    }

    /// Tool specs sent with every completion request.
    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::function(
                "list_messages",
                "List recent Gmail message ids (id + threadId) with a count. \
                 Use get_message to read one.",
                json!({
                    "type": "object",
                    "properties": {
                        "maxResults": {
                            "type": "integer",
                            "description": "Cap on returned messages (default 50)"
                        },
                        "query": {
                            "type": "string",
                            "description": "Gmail search query, e.g. \"is:unread newer_than:1d\""
                        }
                    }
                }),
            ),
            ToolSpec::function(
                "get_message",
                "Fetch one message in full: subject, from, to, date, and the \
                 decoded text body.",
                json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Message id from list_messages" }
                    },
                    "required": ["id"]
                }),
            ),
            ToolSpec::function(
                "get_or_create_label",
                "Return the Gmail label with this exact name, creating it if \
                 it doesn't exist yet.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Label name, case-sensitive" }
                    },
                    "required": ["name"]
                }),
            ),
            ToolSpec::function(
                "add_label",
                "Add a label to a message.",
                json!({
                    "type": "object",
                    "properties": {
                        "messageId": { "type": "string" },
                        "labelId": { "type": "string", "description": "Label id from get_or_create_label" }
                    },
                    "required": ["messageId", "labelId"]
                }),
            ),
            ToolSpec::function(
                "create_draft",
                "Create a plain-text reply draft. Creates a new draft every \
                 call, so don't draft twice for the same thread.",
                json!({
                    "type": "object",
                    "properties": {
                        "to": { "type": "string" },
                        "subject": { "type": "string" },
                        "body": { "type": "string" }
                    },
                    "required": ["to", "subject", "body"]
                }),
            ),
            ToolSpec::function(
                "create_event",
                "Insert a calendar event. Timed events take RFC 3339 start/end \
                 and an optional IANA timeZone (default America/Phoenix); \
                 all-day events take YYYY-MM-DD dates with allDay true.",
                json!({
                    "type": "object",
                    "properties": {
                        "summary": { "type": "string" },
                        "description": { "type": "string" },
                        "start": { "type": "string" },
                        "end": { "type": "string" },
                        "timeZone": { "type": "string" },
                        "allDay": { "type": "boolean" }
                    },
                    "required": ["summary", "start", "end"]
                }),
            ),
            ToolSpec::function(
                "list_events",
                "List upcoming calendar events in chronological order, \
                 starting from timeMin (default now).",
                json!({
                    "type": "object",
                    "properties": {
                        "maxResults": {
                            "type": "integer",
                            "description": "Cap on returned events (default 50)"
                        },
                        "timeMin": {
                            "type": "string",
                            "description": "RFC 3339 lower bound on event start"
                        }
                    }
                }),
            ),
        ]
    }

    /// Execute one tool call. Operation failures surface unchanged.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, AgentError> {
        let args: Value = if arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(arguments)?
        };

        match name {
            "list_messages" => {
                let args: ListMessagesArgs = serde_json::from_value(args)?;
                let client = GmailClient::connect(&self.cache).await?;
                let result = client
                    .list_messages(args.max_results, args.query.as_deref())
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            "get_message" => {
                let args: GetMessageArgs = serde_json::from_value(args)?;
                let client = GmailClient::connect(&self.cache).await?;
                Ok(serde_json::to_value(client.get_message(&args.id).await?)?)
            }
            "get_or_create_label" => {
                let args: LabelArgs = serde_json::from_value(args)?;
                let client = GmailClient::connect(&self.cache).await?;
                Ok(serde_json::to_value(
                    client.get_or_create_label(&args.name).await?,
                )?)
            }
            "add_label" => {
                let args: AddLabelArgs = serde_json::from_value(args)?;
                let client = GmailClient::connect(&self.cache).await?;
                Ok(serde_json::to_value(
                    client.add_label(&args.message_id, &args.label_id).await?,
                )?)
            }
            "create_draft" => {
                let args: CreateDraftArgs = serde_json::from_value(args)?;
                let client = GmailClient::connect(&self.cache).await?;
                Ok(serde_json::to_value(
                    client
                        .create_draft(&args.to, &args.subject, &args.body)
                        .await?,
                )?)
            }
            "create_event" => {
                let input: EventInput = serde_json::from_value(args)?;
                let client = CalendarClient::connect(&self.cache).await?;
                Ok(serde_json::to_value(client.create_event(&input).await?)?)
            }
            "list_events" => {
                let args: ListEventsArgs = serde_json::from_value(args)?;
                let client = CalendarClient::connect(&self.cache).await?;
                let result = client
                    .list_events(args.max_results, args.time_min)
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            other => {
                log::error!("unknown tool requested: {}", other);
                Err(AgentError::UnknownTool(other.to_string()))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::connectors::token_cache::ConnectionFetcher;
    use crate::connectors::{ConnectionItem, ConnectorError, ResourceFamily};

    struct UnreachableFetcher;

    #[async_trait]
    impl ConnectionFetcher for UnreachableFetcher {
        async fn fetch_connection(
            &self,
            family: ResourceFamily,
        ) -> Result<ConnectionItem, ConnectorError> {
            Err(ConnectorError::NotConnected(family))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(TokenCache::new(Arc::new(UnreachableFetcher))))
    }

    #[test]
    fn test_every_tool_has_an_object_schema() {
        let specs = registry().specs();
        let names: Vec<&str> = specs.iter().map(|s| s.function.name).collect();
        assert_eq!(
            names,
            vec![
                "list_messages",
                "get_message",
                "get_or_create_label",
                "add_label",
                "create_draft",
                "create_event",
                "list_events",
            ]
        );
        for spec in &specs {
            assert_eq!(spec.function.parameters["type"], "object");
            assert!(!spec.function.description.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let err = registry().dispatch("send_money", "{}").await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "send_money"));
    }

    #[tokio::test]
    async fn test_connector_failure_propagates_through_dispatch() {
        let err = registry().dispatch("list_messages", "{}").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Connector(ConnectorError::NotConnected(ResourceFamily::Mail))
        ));
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_a_json_error() {
        let err = registry()
            .dispatch("get_message", r#"{"id": 7}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Json(_)));
    }

    #[test]
    fn test_list_args_accept_empty_object() {
        let args: ListMessagesArgs = serde_json::from_str("{}").unwrap();
        assert!(args.max_results.is_none());
        assert!(args.query.is_none());
    }

    #[test]
    fn test_list_events_args_parse_rfc3339_time_min() {
        let args: ListEventsArgs =
            serde_json::from_str(r#"{"timeMin": "2026-08-05T00:00:00Z", "maxResults": 2}"#)
                .unwrap();
        assert_eq!(args.max_results, Some(2));
        assert_eq!(args.time_min.unwrap().to_rfc3339(), "2026-08-05T00:00:00+00:00");
    }
}
