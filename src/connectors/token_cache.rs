//! Lazy access-token acquisition with expiry-based caching.
//!
//! One credential record per resource family, replaced wholesale on every
//! refresh. A record present in the cache always came from a successful
//! registry fetch; there is no invalid-but-cached state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{ConnectionItem, ConnectionListResponse, ConnectorError, ResourceFamily};
use crate::config;

/// Cached token plus optional expiry for one resource family.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Fresh while the expiry is strictly in the future. A record without
    /// an expiry never goes stale.
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expiry) => expiry > now,
        }
    }
}

/// Fetches the connection item for a resource family.
///
/// The production implementation talks to the connector registry; tests
/// inject a scripted fetcher so cache behavior is deterministic.
#[async_trait]
pub trait ConnectionFetcher: Send + Sync {
    async fn fetch_connection(
        &self,
        family: ResourceFamily,
    ) -> Result<ConnectionItem, ConnectorError>;
}

/// HTTP fetcher against the connector registry endpoint.
pub struct RegistryFetcher {
    http: reqwest::Client,
}

impl RegistryFetcher {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for RegistryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionFetcher for RegistryFetcher {
    async fn fetch_connection(
        &self,
        family: ResourceFamily,
    ) -> Result<ConnectionItem, ConnectorError> {
        let hostname = config::connectors_hostname()?;
        let auth = config::registry_auth_token()?;

        let mut url = url::Url::parse(&format!("https://{}/api/v2/connection", hostname))
            .map_err(|e| {
                ConnectorError::Configuration(format!("bad connectors hostname: {}", e))
            })?;
        url.query_pairs_mut()
            .append_pair("include_secrets", "true")
            .append_pair("connector_names", family.connector_name());

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X_REPLIT_TOKEN", auth)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::error!("connection fetch for {} failed: {} {}", family, status, body);
            return Err(ConnectorError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let list: ConnectionListResponse = resp.json().await?;
        list.items
            .into_iter()
            .next()
            .ok_or(ConnectorError::NotConnected(family))
    }
}

/// Process-wide token cache: a family-to-record map behind a mutex, plus
/// the fetcher used on a miss.
pub struct TokenCache {
    records: Mutex<HashMap<ResourceFamily, CredentialRecord>>,
    fetcher: Arc<dyn ConnectionFetcher>,
}

impl TokenCache {
    pub fn new(fetcher: Arc<dyn ConnectionFetcher>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            fetcher,
        }
    }

    /// Registry-backed cache, as wired by the binary.
    pub fn from_registry() -> Self {
        Self::new(Arc::new(RegistryFetcher::new()))
    }

    /// Return a valid access token for the family.
    ///
    /// A cache hit performs zero network calls; a miss or expired record
    /// performs exactly one fetch and overwrites the record. The lock is
    /// not held across the fetch, so concurrent misses for the same
    /// family may each fetch and redundantly overwrite — last successful
    /// fetch wins, and no invalid record is ever stored.
    pub async fn get_access_token(
        &self,
        family: ResourceFamily,
    ) -> Result<String, ConnectorError> {
        let now = Utc::now();
        {
            let records = self.records.lock().await;
            if let Some(record) = records.get(&family) {
                if record.is_fresh(now) {
                    return Ok(record.access_token.clone());
                }
            }
        }

        log::debug!("fetching connection settings for {}", family);
        let item = self.fetcher.fetch_connection(family).await?;

        let access_token = match item.access_token() {
            Some(token) => token.to_string(),
            None => {
                log::error!("connection item for {} carries no access token", family);
                return Err(ConnectorError::NotConnected(family));
            }
        };

        let record = CredentialRecord {
            access_token: access_token.clone(),
            expires_at: item.expires_at(),
        };
        self.records.lock().await.insert(family, record);

        Ok(access_token)
    }
}

// ============================================================================
// Tests
// ============================================================================
