//! Opaque message handle passed to producers and consumer callbacks

use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;

/// An AMQP message as seen by this layer
///
/// Encoding to AMQP sections is the engine's job; this type only carries the
/// body bytes and the few properties a host sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    body: Bytes,
    content_type: Option<String>,
    properties: BTreeMap<String, String>,
}

impl Message {
    /// Create a message from raw body bytes
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            properties: BTreeMap::new(),
        }
    }

    /// Create a JSON message from a serializable value
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| Error::Config(format!("message body is not valid JSON: {}", e)))?;
        Ok(Self::new(body).content_type("application/json"))
    }

    /// Set the content type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add an application property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Content type, if set
    pub fn get_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Application properties
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

impl From<&'static str> for Message {
    fn from(body: &'static str) -> Self {
        Self::new(Bytes::from_static(body.as_bytes()))
    }
}

impl From<Vec<u8>> for Message {
    fn from(body: Vec<u8>) -> Self {
        Self::new(body)
    }
}

impl From<Bytes> for Message {
    fn from(body: Bytes) -> Self {
        Self::new(body)
    }
}
