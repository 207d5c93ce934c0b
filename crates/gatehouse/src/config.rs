//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gatehouse_permissions::{PermissionConfig, RetryConfig};
use gatehouse_router::RouteTable;
use gatehouse_session::SessionConfig;
use gatehouse_transport::{DEFAULT_PERMISSION_METHOD, HttpConfig};
use serde::Deserialize;

use crate::ConfigError;

/// Everything needed to wire an [`AppContext`](crate::AppContext).
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```json
/// { "base_url": "https://erp.example.com", "request_timeout_ms": 5000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Site root of the backend.
    pub base_url: String,

    /// Upper bound on every endpoint call (login, logout, permissions,
    /// profile).
    #[serde(rename = "request_timeout_ms", with = "gatehouse_permissions::millis")]
    pub request_timeout: Duration,

    /// Backend method answering the capability map.
    pub permission_method: String,

    /// Backoff for failed permission loads. Login is never retried.
    pub retry: RetryConfig,

    pub routes: RouteTable,

    /// Where preferences persist. `None` keeps them in memory.
    pub preferences_path: Option<PathBuf>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(10),
            permission_method: DEFAULT_PERMISSION_METHOD.to_string(),
            retry: RetryConfig::default(),
            routes: RouteTable::default(),
            preferences_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parses a JSON config.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed JSON or an invalid route table.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.base_url.clone(),
            timeout: self.request_timeout,
            permission_method: self.permission_method.clone(),
            ..HttpConfig::default()
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: self.request_timeout,
        }
    }

    pub fn permissions(&self) -> PermissionConfig {
        PermissionConfig {
            request_timeout: self.request_timeout,
            retry: self.retry.clone(),
        }
    }
}
