//! Connection state machine

use crate::{Error, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing allocated yet (or the last connect attempt failed)
    Disconnected,

    /// Transport stack, connection and session are live
    Connected,

    /// `close()` has started tearing down
    CloseRequested,

    /// All owned resources released
    Closed,
}

impl ConnectionState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Disconnected, Connected)
                | (Disconnected, CloseRequested)
                | (Connected, CloseRequested)
                | (CloseRequested, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }

    /// Whether `close()` has been entered
    pub fn is_closing(&self) -> bool {
        matches!(self, Self::CloseRequested | Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::CloseRequested => write!(f, "close_requested"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
