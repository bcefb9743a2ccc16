//! Client configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`DocsClient`](super::DocsClient).
///
/// ```
/// use restdocs_http::client::ClientConfig;
///
/// let config = ClientConfig {
///     request_timeout_ms: 5_000,
///     enable_logging: true,
///     ..Default::default()
/// };
/// assert!(config.capture_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for one network exchange
    pub request_timeout_ms: u64,
    /// Idle connections kept per host by the network transport
    pub max_total_connections: u32,
    /// Proxy for the network transport; empty for none
    pub proxy_url: String,
    /// Install the request body interceptor and the response peek filter
    pub capture_enabled: bool,
    /// Log each exchange at debug level
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_ms: 30_000,
            max_total_connections: 100,
            proxy_url: String::new(),
            capture_enabled: true,
            enable_logging: false,
        }
    }
}

impl ClientConfig {
    /// Load settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
