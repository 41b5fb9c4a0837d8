//! Client-side helpers
//!
//! Connection strings in URL or Service Bus form, parsed into a
//! [`ConnectionConfig`](crate::ConnectionConfig).

mod connection_string;

pub use connection_string::{ConnectionInfo, AMQPS_PORT, AMQP_PORT};
