//! Error types

use crate::connection::Layer;
use crate::engine::EngineError;
use thiserror::Error;

/// Errors raised by the connection lifecycle
#[derive(Debug, Error)]
pub enum Error {
    /// Platform/transport subsystem failed to initialize
    #[error("platform initialization failed: {0}")]
    Initialization(#[source] EngineError),

    /// Socket or TLS I/O could not be created
    #[error("failed to create {layer} transport: {source}")]
    TransportCreation {
        /// Layer that failed
        layer: Layer,
        /// Engine failure
        #[source]
        source: EngineError,
    },

    /// SASL mechanism or SASL I/O could not be created
    #[error("SASL PLAIN setup failed: {0}")]
    AuthConstruction(#[source] EngineError),

    /// Protocol connection object could not be created
    #[error("connection creation failed: {0}")]
    ConnectionCreation(#[source] EngineError),

    /// Session could not be created on a fresh connection
    #[error("session creation failed: {0}")]
    SessionCreation(#[source] EngineError),

    /// Operation not valid in the current state
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Producer failed to publish
    #[error("publish to '{resource}' failed: {source}")]
    Publish {
        /// Target resource (queue/topic) name
        resource: String,
        /// Engine failure
        #[source]
        source: EngineError,
    },

    /// Consumer pump failed
    #[error("consume failed: {0}")]
    Consume(#[source] EngineError),

    /// Connection work pump failed
    #[error("work pump failed: {0}")]
    Work(#[source] EngineError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error was raised while building the transport stack.
    ///
    /// Construction failures leave the manager disconnected, so `connect()`
    /// may simply be called again.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            Error::Initialization(_)
                | Error::TransportCreation { .. }
                | Error::AuthConstruction(_)
                | Error::ConnectionCreation(_)
                | Error::SessionCreation(_)
        )
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Initialization(_) => "initialization",
            Error::TransportCreation { .. } => "transport",
            Error::AuthConstruction(_) => "auth",
            Error::ConnectionCreation(_) => "connection",
            Error::SessionCreation(_) => "session",
            Error::InvalidState { .. } => "invalid_state",
            Error::Publish { .. } => "publish",
            Error::Consume(_) => "consume",
            Error::Work(_) => "work",
            Error::Config(_) => "config",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
