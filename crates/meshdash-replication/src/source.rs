//! Replication rule sources

use crate::rule::ReplicationRule;
use async_trait::async_trait;
use meshdash_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Capability returning the replication rules known to a database server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplicationSource: Send + Sync {
    /// Fetch all replication rules from the server at `url`
    async fn fetch_rules(&self, url: &str) -> Result<Vec<ReplicationRule>>;
}

/// Fixed rule list, useful for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticReplicationSource {
    rules: Vec<ReplicationRule>,
}

impl StaticReplicationSource {
    /// Create a source that always returns `rules`
    pub fn new(rules: Vec<ReplicationRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl ReplicationSource for StaticReplicationSource {
    async fn fetch_rules(&self, _url: &str) -> Result<Vec<ReplicationRule>> {
        Ok(self.rules.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AllDocs {
    #[serde(default)]
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
    #[serde(default)]
    doc: Option<ReplicationRule>,
}

/// Reads the `_replicator` database of a CouchDB server
#[derive(Debug, Clone)]
pub struct CouchReplicationSource {
    http_client: reqwest::Client,
}

impl CouchReplicationSource {
    /// Create a source with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Create a source with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Replication(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    fn all_docs_request(&self, base: &str) -> Result<reqwest::RequestBuilder> {
        let mut url = url::Url::parse(base)
            .map_err(|e| Error::Replication(format!("Invalid database URL '{base}': {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Replication(format!(
                "Unsupported database URL scheme '{}'",
                url.scheme()
            )));
        }

        // Credentials travel as basic auth rather than in the request line.
        let username = url.username().to_string();
        let password = url.password().map(str::to_string);
        if !username.is_empty() || password.is_some() {
            url.set_username("")
                .and_then(|()| url.set_password(None))
                .map_err(|()| {
                    Error::Replication(format!("Cannot strip credentials from '{base}'"))
                })?;
        }

        let endpoint = format!(
            "{}/_replicator/_all_docs?include_docs=true",
            url.as_str().trim_end_matches('/')
        );

        let request = self.http_client.get(endpoint);
        Ok(if username.is_empty() && password.is_none() {
            request
        } else {
            request.basic_auth(username, password)
        })
    }
}

#[async_trait]
impl ReplicationSource for CouchReplicationSource {
    async fn fetch_rules(&self, url: &str) -> Result<Vec<ReplicationRule>> {
        let response = self
            .all_docs_request(url)?
            .send()
            .await
            .map_err(|e| Error::Replication(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Replication(format!(
                "Replicator query returned {status}"
            )));
        }

        let all_docs: AllDocs = response
            .json()
            .await
            .map_err(|e| Error::Replication(format!("Invalid replicator response: {e}")))?;

        let rules: Vec<ReplicationRule> = all_docs
            .rows
            .into_iter()
            .filter(|row| !row.id.starts_with("_design/"))
            .filter_map(|row| row.doc)
            .collect();

        debug!(count = rules.len(), "Fetched replication rules");

        Ok(rules)
    }
}
