//! Connector-backed Google API clients.
//!
//! Access tokens come from the connector registry (one OAuth-backed
//! connector per resource family); there is no local consent or refresh
//! flow. A client handle carries the bearer token only, and expiry is
//! handled by re-acquiring through the token cache.
//!
//! Modules:
//! - token_cache: lazy token acquisition with expiry-based caching
//! - gmail: Gmail API v1
//! - calendar: Google Calendar API v3

pub mod calendar;
pub mod gmail;
pub mod token_cache;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// External API families this layer integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
    Mail,
    Calendar,
}

impl ResourceFamily {
    /// Name the connector is registered under.
    pub fn connector_name(&self) -> &'static str {
        match self {
            ResourceFamily::Mail => "google-mail",
            ResourceFamily::Calendar => "google-calendar",
        }
    }
}

impl std::fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.connector_name())
    }
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// No identity credential or registry hostname available. Fatal until
    /// an operator fixes the environment.
    #[error("configuration: {0}")]
    Configuration(String),
    /// The registry answered but no usable token was found for the family.
    /// Recoverable by re-authorizing the external connection.
    #[error("{0} is not connected")]
    NotConnected(ResourceFamily),
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Send a request and surface any failure, transport or non-2xx status,
/// with the operation logged first. Nothing is retried here; the engine
/// driving the workflow owns retries.
pub(crate) async fn execute(
    operation: &str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ConnectorError> {
    let resp = request.send().await.map_err(|e| {
        log::error!("{} failed: {}", operation, e);
        ConnectorError::Http(e)
    })?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    log::error!("{} failed: {} {}", operation, status, message);
    Err(ConnectorError::Api {
        status: status.as_u16(),
        message,
    })
}

// ============================================================================
// Connection payload — what the registry returns for a connector
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionListResponse {
    #[serde(default)]
    pub items: Vec<ConnectionItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionItem {
    #[serde(default)]
    pub settings: ConnectionSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub access_token: Option<String>,
    /// ISO timestamp; absent for connectors whose tokens don't expire.
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub oauth: Option<OauthSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OauthSettings {
    #[serde(default)]
    pub credentials: Option<OauthCredentials>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OauthCredentials {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl ConnectionItem {
    /// Extract the access token: the direct settings field wins, then the
    /// nested OAuth credentials field.
    pub fn access_token(&self) -> Option<&str> {
        if let Some(token) = self.settings.access_token.as_deref() {
            return Some(token);
        }
        self.settings
            .oauth
            .as_ref()
            .and_then(|o| o.credentials.as_ref())
            .and_then(|c| c.access_token.as_deref())
    }

    /// Parsed expiry, if the settings carry one. An unparseable timestamp
    /// is treated as absent.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.settings
            .expires_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ============================================================================
// Tests
// ============================================================================
