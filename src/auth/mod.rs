//! Authentication
//!
//! Only SASL PLAIN is supported at this layer. The mechanism object itself is
//! created by the engine from [`SaslPlainCredentials`].

mod sasl_plain;

pub use sasl_plain::SaslPlainCredentials;
