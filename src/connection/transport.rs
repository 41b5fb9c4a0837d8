//! Transport stack: socket, optional TLS, optional SASL PLAIN
//!
//! The stack is built bottom-up and released top-down:
//!
//! ```text
//!   build:    socket/TLS I/O -> SASL mechanism -> SASL I/O
//!   release:  SASL I/O -> socket/TLS I/O -> SASL mechanism
//! ```
//!
//! The SASL I/O references both the I/O beneath it and the mechanism, so it
//! dies first. The mechanism outlives the I/O chain during destruction.

use super::tls::{parse_server_name, TlsConfig};
use super::ConnectionConfig;
use crate::auth::SaslPlainCredentials;
use crate::engine::{Engine, SocketIoConfig, TlsIoConfig};
use crate::{Error, Result};
use std::fmt;

/// One I/O layer in the transport stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Plain TCP socket
    Socket,
    /// TLS over the socket
    Tls,
    /// SASL client I/O over the socket or TLS
    Sasl,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Socket => write!(f, "socket"),
            Layer::Tls => write!(f, "TLS"),
            Layer::Sasl => write!(f, "SASL"),
        }
    }
}

/// SASL PLAIN mechanism plus the SASL I/O wrapping the base transport
pub struct AuthLayer<E: Engine> {
    io: E::Io,
    mechanism: E::Mechanism,
}

impl<E: Engine> AuthLayer<E> {
    /// Create the mechanism and wrap `underlying` in SASL client I/O.
    ///
    /// On failure nothing created here is left alive; `underlying` is untouched
    /// and still owned by the caller.
    pub fn wrap(
        engine: &mut E,
        underlying: &E::Io,
        credentials: &SaslPlainCredentials,
    ) -> Result<Self> {
        let mechanism = engine
            .create_sasl_plain_mechanism(credentials)
            .map_err(Error::AuthConstruction)?;

        match engine.create_sasl_io(underlying, &mechanism) {
            Ok(io) => {
                tracing::debug!(user = %credentials.username(), "SASL PLAIN layer created");
                Ok(Self { io, mechanism })
            }
            Err(e) => {
                engine.destroy_mechanism(mechanism);
                Err(Error::AuthConstruction(e))
            }
        }
    }
}

/// The owned I/O chain a protocol connection is built on
pub struct TransportStack<E: Engine> {
    base: E::Io,
    base_layer: Layer,
    auth: Option<AuthLayer<E>>,
}

impl<E: Engine> TransportStack<E> {
    /// The I/O the protocol connection must be created over
    pub fn top(&self) -> &E::Io {
        match &self.auth {
            Some(auth) => &auth.io,
            None => &self.base,
        }
    }

    /// Layers from the bottom up, e.g. `[Socket, Tls, Sasl]`
    pub fn layers(&self) -> Vec<Layer> {
        let mut layers = vec![Layer::Socket];
        if self.base_layer == Layer::Tls {
            layers.push(Layer::Tls);
        }
        if self.auth.is_some() {
            layers.push(Layer::Sasl);
        }
        layers
    }

    /// Number of layers
    pub fn depth(&self) -> usize {
        self.layers().len()
    }

    /// Whether SASL PLAIN is part of the stack
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Destroy every layer: SASL I/O, base I/O, then the SASL mechanism
    pub fn release(self, engine: &mut E) {
        let TransportStack {
            base,
            base_layer,
            auth,
        } = self;

        let mechanism = auth.map(|AuthLayer { io, mechanism }| {
            engine.destroy_io(io);
            tracing::debug!("SASL I/O destroyed");
            mechanism
        });

        engine.destroy_io(base);
        tracing::debug!(layer = %base_layer, "base I/O destroyed");

        if let Some(mechanism) = mechanism {
            engine.destroy_mechanism(mechanism);
            tracing::debug!("SASL mechanism destroyed");
        }
    }
}

impl<E: Engine> fmt::Debug for TransportStack<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportStack")
            .field("layers", &self.layers())
            .finish()
    }
}

/// Builds a [`TransportStack`] from connection parameters
#[derive(Debug)]
pub struct TransportBuilder<'a> {
    host: &'a str,
    port: u16,
    use_tls: bool,
    tls: Option<&'a TlsConfig>,
    credentials: Option<SaslPlainCredentials>,
}

impl<'a> TransportBuilder<'a> {
    /// Prepare a builder for `config`, with optional TLS trust settings
    pub fn new(config: &'a ConnectionConfig, tls: Option<&'a TlsConfig>) -> Self {
        Self {
            host: &config.host,
            port: config.port,
            use_tls: config.use_tls,
            tls,
            credentials: config.credentials(),
        }
    }

    /// Reject parameters that could never produce a working stack
    ///
    /// Runs before anything is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must not be 0".into()));
        }
        if self.use_tls {
            parse_server_name(self.host)?;
        }
        Ok(())
    }

    /// Layers this builder will produce
    pub fn planned_layers(&self) -> Vec<Layer> {
        let mut layers = vec![Layer::Socket];
        if self.use_tls {
            layers.push(Layer::Tls);
        }
        if self.credentials.is_some() {
            layers.push(Layer::Sasl);
        }
        layers
    }

    /// Create the base I/O and, when credentials are present, the SASL layer.
    ///
    /// If the SASL layer fails the base I/O is destroyed before returning.
    pub fn build<E: Engine>(&self, engine: &mut E) -> Result<TransportStack<E>> {
        let (base, base_layer) = if self.use_tls {
            let config = TlsIoConfig {
                host: self.host,
                port: self.port,
                tls: self.tls,
            };
            let io = engine
                .create_tls_io(&config)
                .map_err(|source| Error::TransportCreation {
                    layer: Layer::Tls,
                    source,
                })?;
            (io, Layer::Tls)
        } else {
            let config = SocketIoConfig {
                host: self.host,
                port: self.port,
                proxy: None,
            };
            let io = engine
                .create_socket_io(&config)
                .map_err(|source| Error::TransportCreation {
                    layer: Layer::Socket,
                    source,
                })?;
            (io, Layer::Socket)
        };
        tracing::debug!(layer = %base_layer, host = %self.host, port = self.port, "base I/O created");

        let auth = match &self.credentials {
            Some(credentials) => match AuthLayer::wrap(engine, &base, credentials) {
                Ok(auth) => Some(auth),
                Err(e) => {
                    engine.destroy_io(base);
                    return Err(e);
                }
            },
            None => None,
        };

        Ok(TransportStack {
            base,
            base_layer,
            auth,
        })
    }
}
