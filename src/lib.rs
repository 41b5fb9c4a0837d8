//! amqp-bind: AMQP 1.0 connection lifecycle over an external protocol engine
//!
//! This crate owns the part of an AMQP client binding that has real design in it:
//! turning `(host, port, use_tls, credentials)` into a layered transport
//! (socket, optional TLS, optional SASL PLAIN), creating the protocol connection
//! and its single session on top, and tearing all of it down again in the one
//! order that never leaves a dangling handle.
//!
//! Framing, TLS handshakes, socket I/O and link flow control belong to the
//! [`engine::Engine`] implementation supplied by the host.
//!
//! # Example
//!
//! ```ignore
//! use amqp_bind::{ConnectionConfig, ConnectionManager, Message};
//!
//! let config = ConnectionConfig::builder("broker.local", 5671)
//!     .use_tls(true)
//!     .credentials("user1", "secret")
//!     .build();
//!
//! let mut conn = ConnectionManager::new(engine, config);
//! conn.publish("queue1", &Message::from("hello"))?;
//! while !done {
//!     conn.do_work()?;
//! }
//! conn.close()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod client;
pub mod connection;
pub mod driver;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod platform;

pub use client::ConnectionInfo;
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use driver::WorkLoopDriver;
pub use engine::{Engine, EngineError, Message};
pub use error::{Error, Result};
pub use platform::Platform;
