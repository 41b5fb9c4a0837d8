//! Connection manager: lazy connect, publish/consume glue and ordered teardown

use super::session::{ConsumerId, Session};
use super::state::ConnectionState;
use super::tls::TlsConfig;
use super::transport::{Layer, TransportBuilder, TransportStack};
use super::ConnectionConfig;
use crate::engine::{Consumer, Engine, Message, WorkStatus};
use crate::platform::{Platform, PlatformLease};
use crate::{Error, Result};
use std::fmt;
use std::time::Instant;

/// Everything `connect()` allocates, released as a unit by `close()`
struct Live<E: Engine> {
    lease: PlatformLease,
    transport: TransportStack<E>,
    connection: E::Connection,
    session: Session<E>,
}

impl<E: Engine> Live<E> {
    /// Release in dependency order: session and its links, protocol
    /// connection, transport stack (SASL I/O, base I/O, mechanism), platform.
    fn release(self, engine: &mut E) {
        let Live {
            lease,
            transport,
            connection,
            session,
        } = self;

        session.end(engine);
        engine.destroy_connection(connection);
        tracing::debug!("connection destroyed");
        transport.release(engine);
        lease.release(engine);
    }
}

/// Owns the transport stack, protocol connection and session of one broker
/// connection.
///
/// Single-threaded and cooperative: nothing here blocks or schedules. The host
/// must call [`do_work`](Self::do_work) (and [`consume`](Self::consume) once a
/// callback is set) on its own cadence for any I/O to happen.
pub struct ConnectionManager<E: Engine> {
    engine: E,
    config: ConnectionConfig,
    tls: Option<TlsConfig>,
    platform: Platform,
    state: ConnectionState,
    close_requested: bool,
    live: Option<Live<E>>,
    consumer: Option<ConsumerId>,
}

impl<E: Engine> ConnectionManager<E> {
    /// Create a manager; nothing is allocated until the first `connect()`
    pub fn new(engine: E, config: ConnectionConfig) -> Self {
        Self {
            engine,
            config,
            tls: None,
            platform: Platform::global(),
            state: ConnectionState::Disconnected,
            close_requested: false,
            live: None,
            consumer: None,
        }
    }

    /// Use explicit TLS trust settings instead of the engine default
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Use a specific platform registry instead of the process-wide one
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Build the transport stack, connection and session.
    ///
    /// No-op while connected. On failure everything built so far is released
    /// and the manager stays disconnected, so the call can be retried.
    pub fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Disconnected => {}
            state => {
                return Err(Error::InvalidState {
                    expected: "disconnected or connected".into(),
                    actual: state.to_string(),
                })
            }
        }

        let span = tracing::info_span!(
            "connect",
            host = %self.config.host,
            port = self.config.port,
            tls = self.config.use_tls,
            auth = self.config.use_auth()
        );
        let _enter = span.enter();
        let start = Instant::now();

        match self.open() {
            Ok(live) => {
                self.live = Some(live);
                self.state.transition(ConnectionState::Connected)?;
                crate::metrics::counters::connection_attempt(crate::metrics::labels::OUTCOME_OK);
                crate::metrics::histograms::connect_duration(start.elapsed().as_millis() as u64);
                tracing::info!("connected");
                Ok(())
            }
            Err(e) => {
                crate::metrics::counters::connection_attempt(crate::metrics::labels::OUTCOME_ERROR);
                crate::metrics::counters::connection_failed(e.kind());
                tracing::warn!(error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// Steps of `connect()`; each failure unwinds what the earlier steps built
    fn open(&mut self) -> Result<Live<E>> {
        let builder = TransportBuilder::new(&self.config, self.tls.as_ref());
        builder.validate()?;

        let lease = self.platform.acquire(&mut self.engine)?;

        let transport = match builder.build(&mut self.engine) {
            Ok(transport) => transport,
            Err(e) => {
                lease.release(&mut self.engine);
                return Err(e);
            }
        };

        let mut connection = match self.engine.create_connection(
            transport.top(),
            &self.config.host,
            &self.config.client_name,
        ) {
            Ok(connection) => connection,
            Err(e) => {
                transport.release(&mut self.engine);
                lease.release(&mut self.engine);
                return Err(Error::ConnectionCreation(e));
            }
        };

        if self.config.debug_trace {
            self.engine.set_trace(&mut connection, true);
            tracing::debug!("protocol tracing enabled");
        }

        let session = match Session::begin(&mut self.engine, &mut connection) {
            Ok(session) => session,
            Err(e) => {
                self.engine.destroy_connection(connection);
                transport.release(&mut self.engine);
                lease.release(&mut self.engine);
                return Err(e);
            }
        };

        Ok(Live {
            lease,
            transport,
            connection,
            session,
        })
    }

    /// Publish `message` to `resource` through a fresh producer.
    ///
    /// Connects first if needed. Engine failures are returned as-is.
    pub fn publish(&mut self, resource: &str, message: &Message) -> Result<()> {
        self.ensure_open()?;
        self.connect()?;

        let live = require_live(&mut self.live, self.state)?;
        let result = live.session.publish(&mut self.engine, resource, message);

        let outcome = if result.is_ok() {
            crate::metrics::labels::OUTCOME_OK
        } else {
            crate::metrics::labels::OUTCOME_ERROR
        };
        crate::metrics::counters::publish(outcome);
        result
    }

    /// Attach a consumer to `resource` and make it the tracked one.
    ///
    /// Connects first if needed. A previously tracked consumer is closed and
    /// removed from the session before the new one is attached.
    pub fn set_callback<M, L>(
        &mut self,
        resource: &str,
        on_message: M,
        on_loop_tick: L,
    ) -> Result<ConsumerId>
    where
        M: FnMut(&Message) + 'static,
        L: FnMut() + 'static,
    {
        self.ensure_open()?;
        self.connect()?;

        let previous = self.consumer.take();
        let live = require_live(&mut self.live, self.state)?;

        if let Some(previous) = previous {
            if let Some(consumer) = live.session.consumer_mut(previous) {
                if !consumer.close_requested() {
                    if let Err(e) = consumer.close() {
                        tracing::warn!(error = %e, "closing replaced consumer failed");
                    }
                }
            }
            live.session.remove_consumer(&mut self.engine, previous);
            crate::metrics::counters::consumer_replaced();
            tracing::warn!(resource, "replacing tracked consumer");
        }

        let id = live.session.attach_consumer(&mut self.engine, resource)?;
        if let Some(consumer) = live.session.consumer_mut(id) {
            consumer.set_callback(Box::new(on_message), Box::new(on_loop_tick));
        }
        self.consumer = Some(id);
        Ok(id)
    }

    /// Pump the tracked consumer once
    pub fn consume(&mut self) -> Result<()> {
        self.ensure_open()?;
        let id = self.consumer.ok_or_else(|| Error::InvalidState {
            expected: "tracked consumer (call set_callback first)".into(),
            actual: "no consumer".into(),
        })?;

        let live = require_live(&mut self.live, self.state)?;
        let consumer = live
            .session
            .consumer_mut(id)
            .ok_or_else(|| Error::InvalidState {
                expected: "tracked consumer".into(),
                actual: "consumer removed".into(),
            })?;
        consumer.consume().map_err(Error::Consume)
    }

    /// Run one non-blocking unit of protocol work
    pub fn do_work(&mut self) -> Result<WorkStatus> {
        self.ensure_open()?;
        let live = require_live(&mut self.live, self.state)?;
        self.engine
            .pump_work(&mut live.connection)
            .map_err(Error::Work)
    }

    /// Close the tracked consumer, then release every owned handle.
    ///
    /// Safe to call any number of times; teardown runs once. A failure to
    /// close the consumer does not stop the teardown and is returned after it.
    pub fn close(&mut self) -> Result<()> {
        let mut result = Ok(());

        if let (Some(id), Some(live)) = (self.consumer, self.live.as_mut()) {
            if let Some(consumer) = live.session.consumer_mut(id) {
                if !consumer.close_requested() {
                    if let Err(e) = consumer.close() {
                        tracing::warn!(error = %e, "consumer close failed");
                        result = Err(Error::Consume(e));
                    }
                }
            }
        }

        if !self.close_requested {
            self.close_requested = true;
            debug_assert!(self.state.can_transition_to(ConnectionState::CloseRequested));
            self.state = ConnectionState::CloseRequested;

            match self.live.take() {
                Some(live) => {
                    live.release(&mut self.engine);
                    crate::metrics::counters::teardown();
                    tracing::info!(host = %self.config.host, "connection closed");
                }
                None => tracing::debug!("close before connect, nothing to release"),
            }
            self.consumer = None;
            self.state = ConnectionState::Closed;
        }

        result
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_closing() {
            return Err(Error::InvalidState {
                expected: "open connection".into(),
                actual: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Broker host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Whether protocol tracing was requested
    pub fn is_debug_on(&self) -> bool {
        self.config.debug_trace
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Underlying protocol connection, while connected
    pub fn connection_handle(&self) -> Option<&E::Connection> {
        self.live.as_ref().map(|live| &live.connection)
    }

    /// Session, while connected
    pub fn session(&self) -> Option<&Session<E>> {
        self.live.as_ref().map(|live| &live.session)
    }

    /// Transport layers from the bottom up, while connected
    pub fn transport_layers(&self) -> Option<Vec<Layer>> {
        self.live.as_ref().map(|live| live.transport.layers())
    }

    /// The consumer set by the latest `set_callback()`
    pub fn tracked_consumer(&self) -> Option<ConsumerId> {
        self.consumer
    }

    /// The engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

fn require_live<E: Engine>(
    live: &mut Option<Live<E>>,
    state: ConnectionState,
) -> Result<&mut Live<E>> {
    live.as_mut().ok_or_else(|| Error::InvalidState {
        expected: ConnectionState::Connected.to_string(),
        actual: state.to_string(),
    })
}

impl<E: Engine> Drop for ConnectionManager<E> {
    fn drop(&mut self) {
        if !self.close_requested {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "close on drop failed");
            }
        }
    }
}

impl<E: Engine> fmt::Debug for ConnectionManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("layers", &self.transport_layers())
            .field("consumer", &self.consumer)
            .finish()
    }
}
