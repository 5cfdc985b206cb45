//! Mailroom: an inbox concierge agent.
//!
//! A two-step workflow runs a hosted-LLM agent whose tools map one-to-one
//! onto Gmail and Google Calendar calls. Access tokens come from the
//! connector registry and are cached per resource family until expiry.

pub mod agent;
pub mod config;
pub mod connectors;
pub mod workflow;

pub use agent::{Agent, AgentError};
pub use connectors::token_cache::TokenCache;
pub use connectors::{ConnectorError, ResourceFamily};
