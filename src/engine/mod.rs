//! External engine boundary
//!
//! The AMQP frame/state machine, TLS handshake, socket I/O and link bookkeeping
//! live in an external engine. This module describes the surface the connection
//! lifecycle needs from it:
//!
//! * Platform init/deinit (process-wide, see [`crate::platform`])
//! * I/O layer factories: plain socket, TLS, SASL-wrapping
//! * SASL PLAIN mechanism factory
//! * Protocol connection factory, tracing toggle and non-blocking work pump
//! * Session, producer and consumer factories
//!
//! Every handle is an owned value that is released only by handing it back to
//! the matching `destroy_*` call. Nothing is released on `Drop`, so the order
//! in which handles die is decided by the caller alone.

mod message;

pub use message::Message;

use crate::auth::SaslPlainCredentials;
use crate::connection::TlsConfig;

/// Error reported by the external engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine error{}: {message}", fmt_code(.code))]
pub struct EngineError {
    message: String,
    code: Option<i32>,
}

impl EngineError {
    /// Create an engine error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create an engine error carrying the engine's numeric result code
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Engine result code, if one was reported
    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map(|code| format!(" {}", code)).unwrap_or_default()
}

/// Result of a single engine call
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Outcome of one non-blocking work pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// The engine moved bytes, frames or timers forward
    Progressed,
    /// Nothing was pending
    Idle,
}

/// Plain socket I/O parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketIoConfig<'a> {
    /// Remote host
    pub host: &'a str,
    /// Remote port
    pub port: u16,
    /// HTTP proxy (`host:port`), if any
    pub proxy: Option<&'a str>,
}

/// TLS-wrapped socket I/O parameters
#[derive(Debug, Clone, Copy)]
pub struct TlsIoConfig<'a> {
    /// Remote host (also the SNI name)
    pub host: &'a str,
    /// Remote port
    pub port: u16,
    /// Trust configuration; `None` means the engine's platform default
    pub tls: Option<&'a TlsConfig>,
}

/// Callback invoked for every delivered message
pub type MessageCallback = Box<dyn FnMut(&Message)>;

/// Callback invoked once per consumer loop iteration
pub type LoopCallback = Box<dyn FnMut()>;

/// A sending link created on a session
pub trait Producer {
    /// Publish one message
    fn publish(&mut self, message: &Message) -> EngineResult<()>;
}

/// A receiving link created on a session
pub trait Consumer {
    /// Register the message and loop-tick callbacks
    fn set_callback(&mut self, on_message: MessageCallback, on_loop_tick: LoopCallback);

    /// Pump pending deliveries into the callbacks once
    fn consume(&mut self) -> EngineResult<()>;

    /// Whether a close was already requested on this link
    fn close_requested(&self) -> bool;

    /// Request the link to close (detach)
    fn close(&mut self) -> EngineResult<()>;
}

/// The external AMQP engine and transport library
pub trait Engine {
    /// I/O endpoint (socket, TLS or SASL layer)
    type Io;
    /// SASL mechanism object
    type Mechanism;
    /// Protocol connection object
    type Connection;
    /// AMQP session
    type Session;
    /// Sending link
    type Producer: Producer;
    /// Receiving link
    type Consumer: Consumer;

    /// Initialize the platform/transport subsystem
    fn platform_init(&mut self) -> EngineResult<()>;

    /// Deinitialize the platform/transport subsystem
    fn platform_deinit(&mut self);

    /// Create a plain socket I/O endpoint
    fn create_socket_io(&mut self, config: &SocketIoConfig<'_>) -> EngineResult<Self::Io>;

    /// Create the default TLS I/O endpoint
    fn create_tls_io(&mut self, config: &TlsIoConfig<'_>) -> EngineResult<Self::Io>;

    /// Create a SASL PLAIN mechanism object
    fn create_sasl_plain_mechanism(
        &mut self,
        credentials: &SaslPlainCredentials,
    ) -> EngineResult<Self::Mechanism>;

    /// Create a SASL client I/O layered over `underlying`
    ///
    /// The returned endpoint borrows both `underlying` and `mechanism` inside
    /// the engine; both must outlive it.
    fn create_sasl_io(
        &mut self,
        underlying: &Self::Io,
        mechanism: &Self::Mechanism,
    ) -> EngineResult<Self::Io>;

    /// Destroy an I/O endpoint
    fn destroy_io(&mut self, io: Self::Io);

    /// Destroy a SASL mechanism object
    fn destroy_mechanism(&mut self, mechanism: Self::Mechanism);

    /// Create the protocol connection over the top I/O layer
    fn create_connection(
        &mut self,
        io: &Self::Io,
        host: &str,
        container_id: &str,
    ) -> EngineResult<Self::Connection>;

    /// Toggle protocol frame tracing
    fn set_trace(&mut self, connection: &mut Self::Connection, enabled: bool);

    /// Run one non-blocking unit of protocol work
    fn pump_work(&mut self, connection: &mut Self::Connection) -> EngineResult<WorkStatus>;

    /// Destroy the protocol connection
    fn destroy_connection(&mut self, connection: Self::Connection);

    /// Begin a session on the connection
    fn create_session(&mut self, connection: &mut Self::Connection) -> EngineResult<Self::Session>;

    /// End and destroy a session
    fn destroy_session(&mut self, session: Self::Session);

    /// Attach a sending link to `resource`
    fn create_producer(
        &mut self,
        session: &mut Self::Session,
        resource: &str,
    ) -> EngineResult<Self::Producer>;

    /// Detach and destroy a sending link
    fn destroy_producer(&mut self, producer: Self::Producer);

    /// Attach a receiving link to `resource`
    fn create_consumer(
        &mut self,
        session: &mut Self::Session,
        resource: &str,
    ) -> EngineResult<Self::Consumer>;

    /// Destroy a receiving link
    fn destroy_consumer(&mut self, consumer: Self::Consumer);
}
