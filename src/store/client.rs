//! HTTP client for the remote record store.
//!
//! The store is a managed JSON document database exposing a REST read of
//! any path as `<path>.json`. Only the full-tree read at `/` is used.

use crate::core::RecordTree;
use crate::store::{StoreError, TreeSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Default timeout for the full-tree download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Store connection configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database endpoint, e.g. `https://example.firebaseio.com/`
    pub database_url: String,
    /// JSON credentials file (see [`Credentials`])
    pub credentials_path: Option<PathBuf>,
    /// Upper bound on the whole request
    pub timeout: Duration,
}

impl StoreConfig {
    /// Create a configuration with no credentials and the default timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            credentials_path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of the whole tree rooted at `/`.
    pub fn tree_url(&self) -> String {
        format!("{}/.json", self.database_url.trim_end_matches('/'))
    }
}

/// Credentials supplied out-of-band in a JSON file.
///
/// `access_token` is an OAuth2 token sent as the `access_token` query
/// parameter; `database_secret` is a legacy secret sent as `auth`. The token
/// takes precedence when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub database_secret: Option<String>,
}

impl Credentials {
    /// Read credentials from disk.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Connectivity(format!("cannot read credentials {path:?}: {e}"))
        })?;
        let creds: Credentials = serde_json::from_str(&content).map_err(|e| {
            StoreError::Connectivity(format!("invalid credentials file {path:?}: {e}"))
        })?;

        if creds.query_param().is_none() {
            return Err(StoreError::Connectivity(format!(
                "credentials file {path:?} has neither access_token nor database_secret"
            )));
        }
        Ok(creds)
    }

    /// Query parameter carrying the credential.
    pub fn query_param(&self) -> Option<(&'static str, &str)> {
        if let Some(token) = self.access_token.as_deref() {
            Some(("access_token", token))
        } else {
            self.database_secret.as_deref().map(|s| ("auth", s))
        }
    }
}

/// Async client reading the record tree.
pub struct StoreClient {
    config: StoreConfig,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl StoreClient {
    /// Build the HTTP client and load credentials. Makes no request.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let credentials = config
            .credentials_path
            .as_deref()
            .map(Credentials::load)
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connectivity(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    /// Download the whole tree.
    pub async fn fetch_tree(&self) -> Result<RecordTree, StoreError> {
        let mut request = self.client.get(self.config.tree_url());
        if let Some((key, value)) = self.credentials.as_ref().and_then(Credentials::query_param) {
            request = request.query(&[(key, value)]);
        }

        let response = request.send().await.map_err(|e| self.network_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(StoreError::Connectivity(format!(
                "authentication rejected by store ({})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::Connectivity(format!(
                "store returned {}: {message}",
                status.as_u16()
            )));
        }

        let root: serde_json::Value = response.json().await.map_err(|e| self.network_error(e))?;
        if root.is_null() {
            return Err(StoreError::Connectivity(
                "store returned an empty tree".to_string(),
            ));
        }

        tracing::info!(url = %self.config.database_url, "downloaded record tree");
        Ok(RecordTree::new(root))
    }

    /// Map a transport or decode failure. The URL is stripped because it
    /// carries the credential in its query string.
    fn network_error(&self, e: reqwest::Error) -> StoreError {
        let e = e.without_url();
        if e.is_timeout() {
            StoreError::Connectivity(format!(
                "request timed out after {}s",
                self.config.timeout.as_secs_f64()
            ))
        } else {
            StoreError::Connectivity(e.to_string())
        }
    }
}

/// Blocking client for synchronous callers.
///
/// Construction is free of side effects; the runtime, HTTP client and
/// credentials are set up on the first [`TreeSource::fetch_tree`] call.
pub struct BlockingStoreClient {
    config: StoreConfig,
    connection: OnceLock<Connection>,
}

struct Connection {
    runtime: tokio::runtime::Runtime,
    client: StoreClient,
}

impl BlockingStoreClient {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            connection: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether the lazy connection has been set up.
    pub fn is_connected(&self) -> bool {
        self.connection.get().is_some()
    }

    fn connection(&self) -> Result<&Connection, StoreError> {
        if let Some(conn) = self.connection.get() {
            return Ok(conn);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Connectivity(format!("failed to create runtime: {e}")))?;
        let client = StoreClient::new(self.config.clone())?;

        let _ = self.connection.set(Connection { runtime, client });
        self.connection
            .get()
            .ok_or_else(|| StoreError::Connectivity("connection setup failed".to_string()))
    }
}

impl TreeSource for BlockingStoreClient {
    fn fetch_tree(&self) -> Result<RecordTree, StoreError> {
        let conn = self.connection()?;
        conn.runtime.block_on(conn.client.fetch_tree())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tree_url() {
        let config = StoreConfig::new("https://example.firebaseio.com/");
        assert_eq!(config.tree_url(), "https://example.firebaseio.com/.json");

        let config = StoreConfig::new("http://127.0.0.1:9000");
        assert_eq!(config.tree_url(), "http://127.0.0.1:9000/.json");
    }

    #[test]
    fn test_credentials_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");

        std::fs::write(&path, r#"{"database_secret": "s3cret"}"#).unwrap();
        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.query_param(), Some(("auth", "s3cret")));

        std::fs::write(&path, r#"{"database_secret": "s", "access_token": "tok"}"#).unwrap();
        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.query_param(), Some(("access_token", "tok")));
    }

    #[test]
    fn test_credentials_without_secret_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, r#"{"type": "service_account"}"#).unwrap();

        assert!(matches!(
            Credentials::load(&path),
            Err(StoreError::Connectivity(_))
        ));
        assert!(matches!(
            Credentials::load(&dir.path().join("absent.json")),
            Err(StoreError::Connectivity(_))
        ));
    }

    #[test]
    fn test_blocking_client_is_lazy() {
        let client = BlockingStoreClient::new(StoreConfig::new("http://127.0.0.1:1"));
        assert!(!client.is_connected());
        assert_eq!(client.config().timeout, DEFAULT_TIMEOUT);
    }
}
