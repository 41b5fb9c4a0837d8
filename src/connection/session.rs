//! Session and the links it owns

use crate::engine::{Engine, Message, Producer};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Non-owning key for a consumer held by a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(u64);

/// The single AMQP session of a connection
///
/// Owns every consumer attached through it. Callers only hold [`ConsumerId`]s,
/// so a consumer can never outlive its session. Ids are never reused.
pub struct Session<E: Engine> {
    handle: E::Session,
    consumers: BTreeMap<u64, E::Consumer>,
    next_consumer: u64,
}

impl<E: Engine> Session<E> {
    /// Begin a session on `connection`
    pub(crate) fn begin(engine: &mut E, connection: &mut E::Connection) -> Result<Self> {
        let handle = engine
            .create_session(connection)
            .map_err(Error::SessionCreation)?;
        tracing::debug!("session created");
        Ok(Self {
            handle,
            consumers: BTreeMap::new(),
            next_consumer: 0,
        })
    }

    /// Attach a transient producer, publish once, then destroy it
    pub(crate) fn publish(&mut self, engine: &mut E, resource: &str, message: &Message) -> Result<()> {
        let mut producer = engine
            .create_producer(&mut self.handle, resource)
            .map_err(|source| Error::Publish {
                resource: resource.to_string(),
                source,
            })?;

        let result = producer.publish(message);
        engine.destroy_producer(producer);

        result.map_err(|source| Error::Publish {
            resource: resource.to_string(),
            source,
        })
    }

    /// Attach a consumer to `resource`
    pub(crate) fn attach_consumer(&mut self, engine: &mut E, resource: &str) -> Result<ConsumerId> {
        let consumer = engine
            .create_consumer(&mut self.handle, resource)
            .map_err(Error::Consume)?;

        let id = self.next_consumer;
        self.next_consumer += 1;
        self.consumers.insert(id, consumer);
        tracing::debug!(resource, id, "consumer attached");
        Ok(ConsumerId(id))
    }

    /// Borrow a consumer
    pub fn consumer(&self, id: ConsumerId) -> Option<&E::Consumer> {
        self.consumers.get(&id.0)
    }

    /// Borrow a consumer mutably
    pub fn consumer_mut(&mut self, id: ConsumerId) -> Option<&mut E::Consumer> {
        self.consumers.get_mut(&id.0)
    }

    /// Destroy a consumer
    pub(crate) fn remove_consumer(&mut self, engine: &mut E, id: ConsumerId) {
        if let Some(consumer) = self.consumers.remove(&id.0) {
            engine.destroy_consumer(consumer);
        }
    }

    /// Number of live consumers
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Underlying engine session
    pub fn handle(&self) -> &E::Session {
        &self.handle
    }

    /// Destroy every consumer, then the session itself
    pub(crate) fn end(self, engine: &mut E) {
        for consumer in self.consumers.into_values() {
            engine.destroy_consumer(consumer);
        }
        engine.destroy_session(self.handle);
        tracing::debug!("session destroyed");
    }
}

impl<E: Engine> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("consumers", &self.consumer_count())
            .finish()
    }
}
