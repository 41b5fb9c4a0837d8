//! Metrics emitted by the connection lifecycle
//!
//! Recorded through the `metrics` facade; nothing is exported unless the host
//! installs a recorder.

/// Label values
pub mod labels {
    /// Successful outcome
    pub const OUTCOME_OK: &str = "ok";
    /// Failed outcome
    pub const OUTCOME_ERROR: &str = "error";
}

/// Counter helpers
pub mod counters {
    /// A connect attempt finished
    pub fn connection_attempt(outcome: &'static str) {
        metrics::counter!("amqp_bind_connections_total", "outcome" => outcome).increment(1);
    }

    /// A connect attempt failed at a construction step
    pub fn connection_failed(kind: &'static str) {
        metrics::counter!("amqp_bind_connect_failures_total", "kind" => kind).increment(1);
    }

    /// A full teardown ran
    pub fn teardown() {
        metrics::counter!("amqp_bind_teardowns_total").increment(1);
    }

    /// A publish finished
    pub fn publish(outcome: &'static str) {
        metrics::counter!("amqp_bind_publish_total", "outcome" => outcome).increment(1);
    }

    /// A tracked consumer was replaced by a newer one
    pub fn consumer_replaced() {
        metrics::counter!("amqp_bind_consumer_replaced_total").increment(1);
    }
}

/// Histogram helpers
pub mod histograms {
    /// Time spent building the transport stack, connection and session
    pub fn connect_duration(duration_ms: u64) {
        metrics::histogram!("amqp_bind_connect_duration_ms").record(duration_ms as f64);
    }
}
