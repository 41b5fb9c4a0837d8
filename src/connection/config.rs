//! Connection configuration

use crate::auth::SaslPlainCredentials;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container id used when none is configured
pub const DEFAULT_CLIENT_NAME: &str = "some";

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

/// Connection configuration
///
/// Immutable once handed to a [`ConnectionManager`](super::ConnectionManager).
/// SASL PLAIN is used only when both `key_name` and `key` are non-empty; a
/// one-sided pair silently falls back to an unauthenticated transport.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Wrap the socket in TLS
    #[serde(default)]
    pub use_tls: bool,
    /// SASL PLAIN username (shared access key name)
    #[serde(default)]
    pub key_name: String,
    /// SASL PLAIN password (shared access key)
    #[serde(default, skip_serializing)]
    pub key: String,
    /// Enable protocol frame tracing on the connection
    #[serde(default)]
    pub debug_trace: bool,
    /// AMQP container id announced in Open (default: "some")
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl ConnectionConfig {
    /// Create configuration with default tracing and client name
    pub fn new(
        host: impl Into<String>,
        port: u16,
        use_tls: bool,
        key_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls,
            key_name: key_name.into(),
            key: key.into(),
            debug_trace: false,
            client_name: default_client_name(),
        }
    }

    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ConnectionConfig::builder("broker.local", 5671)
    ///     .use_tls(true)
    ///     .credentials("user1", "secret")
    ///     .debug_trace(true)
    ///     .build();
    /// ```
    pub fn builder(host: impl Into<String>, port: u16) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: Self::new(host, port, false, "", ""),
        }
    }

    /// Load configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid connection config: {}", e)))
    }

    /// Whether SASL PLAIN authentication will be layered on the transport
    pub fn use_auth(&self) -> bool {
        !self.key_name.is_empty() && !self.key.is_empty()
    }

    /// SASL PLAIN credentials, if authentication is enabled
    pub fn credentials(&self) -> Option<SaslPlainCredentials> {
        SaslPlainCredentials::from_key(&self.key_name, &self.key)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("key_name", &self.key_name)
            .field("key", &if self.key.is_empty() { "" } else { "<redacted>" })
            .field("debug_trace", &self.debug_trace)
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// Builder for `ConnectionConfig`
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Enable or disable TLS
    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.config.use_tls = use_tls;
        self
    }

    /// Set SASL PLAIN key name and key
    pub fn credentials(mut self, key_name: impl Into<String>, key: impl Into<String>) -> Self {
        self.config.key_name = key_name.into();
        self.config.key = key.into();
        self
    }

    /// Enable protocol tracing
    pub fn debug_trace(mut self, enabled: bool) -> Self {
        self.config.debug_trace = enabled;
        self
    }

    /// Set the container id
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
