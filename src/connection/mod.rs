//! Connection management
//!
//! This module handles:
//! * Transport layering (socket, optional TLS, optional SASL PLAIN)
//! * Connection lifecycle (lazy connect, ordered teardown)
//! * State machine enforcement
//! * TLS trust configuration

mod config;
mod manager;
mod session;
mod state;
mod tls;
mod transport;

pub use config::{ConnectionConfig, ConnectionConfigBuilder, DEFAULT_CLIENT_NAME};
pub use manager::ConnectionManager;
pub use session::{ConsumerId, Session};
pub use state::ConnectionState;
pub use tls::{parse_server_name, RootSource, TlsConfig, TlsConfigBuilder};
pub use transport::{AuthLayer, Layer, TransportBuilder, TransportStack};
