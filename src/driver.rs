//! Host-side work loop
//!
//! The connection manager never schedules itself. `WorkLoopDriver` is the
//! cadence a host would otherwise write by hand: pump the connection, pump the
//! tracked consumer, repeat on an interval, and give up after a budget of
//! unproductive pumps.

use crate::connection::ConnectionManager;
use crate::engine::{Engine, WorkStatus};
use crate::Result;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Why [`WorkLoopDriver::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown signal fired or its sender was dropped
    Shutdown,
    /// `max_idle_pumps` consecutive pumps made no progress
    IdleBudgetExhausted,
}

/// Summary of a [`WorkLoopDriver::run`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    /// Total pumps performed
    pub pumps: u64,
    /// Pumps that reported progress
    pub progressed: u64,
    /// Why the loop stopped
    pub stop: StopReason,
}

/// Pumps a [`ConnectionManager`] on a fixed cadence
#[derive(Debug, Clone)]
pub struct WorkLoopDriver {
    interval: Duration,
    max_idle_pumps: Option<u32>,
}

impl Default for WorkLoopDriver {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_idle_pumps: None,
        }
    }
}

impl WorkLoopDriver {
    /// Create a driver pumping every `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_idle_pumps: None,
        }
    }

    /// Stop after this many consecutive idle pumps
    ///
    /// Without a budget a hung handshake keeps the loop alive until shutdown.
    pub fn max_idle_pumps(mut self, budget: u32) -> Self {
        self.max_idle_pumps = Some(budget);
        self
    }

    /// Pump interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One connection pump, then one consumer pump if a consumer is tracked
    pub fn pump_once<E: Engine>(manager: &mut ConnectionManager<E>) -> Result<WorkStatus> {
        let status = manager.do_work()?;
        if manager.tracked_consumer().is_some() {
            manager.consume()?;
        }
        Ok(status)
    }

    /// Pump until shutdown or the idle budget runs out.
    ///
    /// The first error from the manager ends the loop and is returned.
    pub async fn run<E: Engine>(
        &self,
        manager: &mut ConnectionManager<E>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DriverReport> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut pumps = 0u64;
        let mut progressed = 0u64;
        let mut idle_streak = 0u32;

        let report = |pumps, progressed, stop| DriverReport {
            pumps,
            progressed,
            stop,
        };

        if *shutdown.borrow() {
            return Ok(report(pumps, progressed, StopReason::Shutdown));
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = Self::pump_once(manager)?;
                    pumps += 1;
                    match status {
                        WorkStatus::Progressed => {
                            progressed += 1;
                            idle_streak = 0;
                        }
                        WorkStatus::Idle => idle_streak += 1,
                    }

                    if let Some(budget) = self.max_idle_pumps {
                        if idle_streak >= budget {
                            tracing::debug!(pumps, budget, "idle budget exhausted");
                            return Ok(report(pumps, progressed, StopReason::IdleBudgetExhausted));
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!(pumps, "work loop shut down");
                        return Ok(report(pumps, progressed, StopReason::Shutdown));
                    }
                }
            }
        }
    }
}
