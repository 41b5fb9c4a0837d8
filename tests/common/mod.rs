//! Recording engine shared by the integration tests
//!
//! Every engine call is appended to a shared log so tests can assert exactly
//! which handles were created and destroyed, and in what order.

#![allow(dead_code)]

use amqp_bind::auth::SaslPlainCredentials;
use amqp_bind::engine::{
    Consumer, EngineResult, LoopCallback, MessageCallback, Producer, SocketIoConfig, TlsIoConfig,
    WorkStatus,
};
use amqp_bind::{ConnectionConfig, ConnectionManager, Engine, EngineError, Message, Platform};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

/// Kind of I/O endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoKind {
    Socket,
    Tls,
    Sasl,
}

/// One engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PlatformInit,
    PlatformDeinit,
    CreateIo(IoKind),
    CreateMechanism { user: String },
    DestroyIo(IoKind),
    DestroyMechanism,
    CreateConnection { over: IoKind, host: String, container_id: String },
    SetTrace(bool),
    PumpWork,
    DestroyConnection,
    CreateSession,
    DestroySession,
    CreateProducer(String),
    Publish(String),
    DestroyProducer(String),
    CreateConsumer(String),
    SetCallback(String),
    Consume(String),
    CloseConsumer(String),
    DestroyConsumer(String),
}

/// Engine calls that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    PlatformInit,
    SocketIo,
    TlsIo,
    Mechanism,
    SaslIo,
    Connection,
    Session,
    Producer,
    Publish,
    Consumer,
    ConsumerClose,
    Pump,
}

#[derive(Default)]
struct Shared {
    calls: Vec<Call>,
    failures: HashSet<FailPoint>,
    pump_script: VecDeque<WorkStatus>,
    inbox: VecDeque<Message>,
    tls_trust_seen: Option<bool>,
    tls_verify_hostname_seen: Option<bool>,
}

/// Handle to the log and failure switches of a [`RecordingEngine`]
#[derive(Clone, Default)]
pub struct Recorder {
    shared: Rc<RefCell<Shared>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.borrow().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.shared.borrow().calls.iter().filter(|c| *c == call).count()
    }

    pub fn count_matching(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.shared.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Calls that release a handle, in order
    pub fn destroys(&self) -> Vec<Call> {
        self.shared
            .borrow()
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::DestroyIo(_)
                        | Call::DestroyMechanism
                        | Call::DestroyConnection
                        | Call::DestroySession
                        | Call::DestroyConsumer(_)
                        | Call::DestroyProducer(_)
                        | Call::PlatformDeinit
                )
            })
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.shared.borrow_mut().calls.clear();
    }

    pub fn fail(&self, point: FailPoint) {
        self.shared.borrow_mut().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.shared.borrow_mut().failures.clear();
    }

    pub fn script_pumps(&self, statuses: impl IntoIterator<Item = WorkStatus>) {
        self.shared.borrow_mut().pump_script.extend(statuses);
    }

    pub fn deliver(&self, message: Message) {
        self.shared.borrow_mut().inbox.push_back(message);
    }

    /// Whether the last TLS I/O was created with explicit trust settings
    pub fn tls_trust_seen(&self) -> Option<bool> {
        self.shared.borrow().tls_trust_seen
    }

    /// Hostname check hint carried by the last explicit TLS config
    pub fn tls_verify_hostname_seen(&self) -> Option<bool> {
        self.shared.borrow().tls_verify_hostname_seen
    }

    /// Handles created minus handles destroyed, platform included
    pub fn live_handles(&self) -> i64 {
        self.shared.borrow().calls.iter().fold(0i64, |n, c| match c {
            Call::PlatformInit
            | Call::CreateIo(_)
            | Call::CreateMechanism { .. }
            | Call::CreateConnection { .. }
            | Call::CreateSession
            | Call::CreateProducer(_)
            | Call::CreateConsumer(_) => n + 1,
            Call::PlatformDeinit
            | Call::DestroyIo(_)
            | Call::DestroyMechanism
            | Call::DestroyConnection
            | Call::DestroySession
            | Call::DestroyProducer(_)
            | Call::DestroyConsumer(_) => n - 1,
            _ => n,
        })
    }

    fn record(&self, call: Call) {
        self.shared.borrow_mut().calls.push(call);
    }

    fn check(&self, point: FailPoint) -> EngineResult<()> {
        if self.shared.borrow().failures.contains(&point) {
            return Err(EngineError::with_code(format!("{:?} failed", point), -1));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Io {
    pub kind: IoKind,
}

#[derive(Debug)]
pub struct Mechanism;

#[derive(Debug)]
pub struct Connection {
    pub over: IoKind,
    pub traced: bool,
}

#[derive(Debug)]
pub struct SessionHandle;

pub struct RecordingProducer {
    resource: String,
    recorder: Recorder,
}

impl Producer for RecordingProducer {
    fn publish(&mut self, _message: &Message) -> EngineResult<()> {
        self.recorder.record(Call::Publish(self.resource.clone()));
        self.recorder.check(FailPoint::Publish)
    }
}

pub struct RecordingConsumer {
    resource: String,
    recorder: Recorder,
    close_requested: bool,
    on_message: Option<MessageCallback>,
    on_loop_tick: Option<LoopCallback>,
}

impl Consumer for RecordingConsumer {
    fn set_callback(&mut self, on_message: MessageCallback, on_loop_tick: LoopCallback) {
        self.recorder.record(Call::SetCallback(self.resource.clone()));
        self.on_message = Some(on_message);
        self.on_loop_tick = Some(on_loop_tick);
    }

    fn consume(&mut self) -> EngineResult<()> {
        self.recorder.record(Call::Consume(self.resource.clone()));
        let pending: Vec<Message> = self.recorder.shared.borrow_mut().inbox.drain(..).collect();
        if let Some(on_message) = self.on_message.as_mut() {
            for message in &pending {
                on_message(message);
            }
        }
        if let Some(on_loop_tick) = self.on_loop_tick.as_mut() {
            on_loop_tick();
        }
        Ok(())
    }

    fn close_requested(&self) -> bool {
        self.close_requested
    }

    fn close(&mut self) -> EngineResult<()> {
        self.recorder.record(Call::CloseConsumer(self.resource.clone()));
        self.close_requested = true;
        self.recorder.check(FailPoint::ConsumerClose)
    }
}

/// Engine double that records every call
pub struct RecordingEngine {
    recorder: Recorder,
}

impl RecordingEngine {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl Engine for RecordingEngine {
    type Io = Io;
    type Mechanism = Mechanism;
    type Connection = Connection;
    type Session = SessionHandle;
    type Producer = RecordingProducer;
    type Consumer = RecordingConsumer;

    fn platform_init(&mut self) -> EngineResult<()> {
        self.recorder.check(FailPoint::PlatformInit)?;
        self.recorder.record(Call::PlatformInit);
        Ok(())
    }

    fn platform_deinit(&mut self) {
        self.recorder.record(Call::PlatformDeinit);
    }

    fn create_socket_io(&mut self, _config: &SocketIoConfig<'_>) -> EngineResult<Io> {
        self.recorder.check(FailPoint::SocketIo)?;
        self.recorder.record(Call::CreateIo(IoKind::Socket));
        Ok(Io {
            kind: IoKind::Socket,
        })
    }

    fn create_tls_io(&mut self, config: &TlsIoConfig<'_>) -> EngineResult<Io> {
        self.recorder.check(FailPoint::TlsIo)?;
        {
            let mut shared = self.recorder.shared.borrow_mut();
            shared.tls_trust_seen = Some(config.tls.is_some());
            shared.tls_verify_hostname_seen = config.tls.map(|tls| tls.verify_hostname());
        }
        self.recorder.record(Call::CreateIo(IoKind::Tls));
        Ok(Io { kind: IoKind::Tls })
    }

    fn create_sasl_plain_mechanism(
        &mut self,
        credentials: &SaslPlainCredentials,
    ) -> EngineResult<Mechanism> {
        self.recorder.check(FailPoint::Mechanism)?;
        credentials
            .initial_response()
            .map_err(|e| EngineError::new(e.to_string()))?;
        self.recorder.record(Call::CreateMechanism {
            user: credentials.username().to_string(),
        });
        Ok(Mechanism)
    }

    fn create_sasl_io(&mut self, underlying: &Io, _mechanism: &Mechanism) -> EngineResult<Io> {
        assert_ne!(underlying.kind, IoKind::Sasl, "SASL must wrap the base I/O");
        self.recorder.check(FailPoint::SaslIo)?;
        self.recorder.record(Call::CreateIo(IoKind::Sasl));
        Ok(Io {
            kind: IoKind::Sasl,
        })
    }

    fn destroy_io(&mut self, io: Io) {
        self.recorder.record(Call::DestroyIo(io.kind));
    }

    fn destroy_mechanism(&mut self, _mechanism: Mechanism) {
        self.recorder.record(Call::DestroyMechanism);
    }

    fn create_connection(
        &mut self,
        io: &Io,
        host: &str,
        container_id: &str,
    ) -> EngineResult<Connection> {
        self.recorder.check(FailPoint::Connection)?;
        self.recorder.record(Call::CreateConnection {
            over: io.kind,
            host: host.to_string(),
            container_id: container_id.to_string(),
        });
        Ok(Connection {
            over: io.kind,
            traced: false,
        })
    }

    fn set_trace(&mut self, connection: &mut Connection, enabled: bool) {
        connection.traced = enabled;
        self.recorder.record(Call::SetTrace(enabled));
    }

    fn pump_work(&mut self, _connection: &mut Connection) -> EngineResult<WorkStatus> {
        self.recorder.record(Call::PumpWork);
        self.recorder.check(FailPoint::Pump)?;
        let status = self.recorder.shared.borrow_mut().pump_script.pop_front();
        Ok(status.unwrap_or(WorkStatus::Idle))
    }

    fn destroy_connection(&mut self, _connection: Connection) {
        self.recorder.record(Call::DestroyConnection);
    }

    fn create_session(&mut self, _connection: &mut Connection) -> EngineResult<SessionHandle> {
        self.recorder.check(FailPoint::Session)?;
        self.recorder.record(Call::CreateSession);
        Ok(SessionHandle)
    }

    fn destroy_session(&mut self, _session: SessionHandle) {
        self.recorder.record(Call::DestroySession);
    }

    fn create_producer(
        &mut self,
        _session: &mut SessionHandle,
        resource: &str,
    ) -> EngineResult<RecordingProducer> {
        self.recorder.check(FailPoint::Producer)?;
        self.recorder.record(Call::CreateProducer(resource.to_string()));
        Ok(RecordingProducer {
            resource: resource.to_string(),
            recorder: self.recorder.clone(),
        })
    }

    fn destroy_producer(&mut self, producer: RecordingProducer) {
        self.recorder.record(Call::DestroyProducer(producer.resource));
    }

    fn create_consumer(
        &mut self,
        _session: &mut SessionHandle,
        resource: &str,
    ) -> EngineResult<RecordingConsumer> {
        self.recorder.check(FailPoint::Consumer)?;
        self.recorder.record(Call::CreateConsumer(resource.to_string()));
        Ok(RecordingConsumer {
            resource: resource.to_string(),
            recorder: self.recorder.clone(),
            close_requested: false,
            on_message: None,
            on_loop_tick: None,
        })
    }

    fn destroy_consumer(&mut self, consumer: RecordingConsumer) {
        self.recorder.record(Call::DestroyConsumer(consumer.resource));
    }
}

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Manager over a fresh recorder and an isolated platform registry
pub fn manager(config: ConnectionConfig) -> (ConnectionManager<RecordingEngine>, Recorder) {
    init_tracing();
    let recorder = Recorder::new();
    let manager = ConnectionManager::new(RecordingEngine::new(recorder.clone()), config)
        .with_platform(Platform::new());
    (manager, recorder)
}

pub fn plain_config() -> ConnectionConfig {
    ConnectionConfig::new("broker.local", 5672, false, "", "")
}
