//! Process-wide platform lifecycle
//!
//! The engine's platform init is process-global. Calling it on every connect and
//! tearing it down on every close breaks the moment two connections coexist, so
//! it is reference counted here: the engine is initialized when the first lease
//! is taken and deinitialized when the last one is returned.

use crate::engine::Engine;
use crate::{Error, Result};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

static GLOBAL: OnceLock<Platform> = OnceLock::new();

/// Reference-counted platform registry
///
/// `Platform::global()` is shared by every connection in the process that does
/// not supply its own. The global registry assumes a single engine
/// implementation per process.
#[derive(Debug, Clone, Default)]
pub struct Platform {
    leases: Arc<Mutex<usize>>,
}

/// Proof that the platform is initialized on behalf of one connection
///
/// Must be handed back through [`PlatformLease::release`]; dropping it leaks
/// one reference and the platform is never deinitialized.
#[derive(Debug)]
#[must_use = "a platform lease must be released"]
pub struct PlatformLease {
    platform: Platform,
}

impl Platform {
    /// Create an isolated registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Platform {
        GLOBAL.get_or_init(Platform::new).clone()
    }

    /// Number of outstanding leases
    pub fn active_leases(&self) -> usize {
        *self.leases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a lease, initializing the engine platform on the first one
    pub fn acquire<E: Engine + ?Sized>(&self, engine: &mut E) -> Result<PlatformLease> {
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        if *leases == 0 {
            engine.platform_init().map_err(Error::Initialization)?;
            tracing::debug!("platform initialized");
        }
        *leases += 1;
        Ok(PlatformLease {
            platform: self.clone(),
        })
    }
}

impl PlatformLease {
    /// Return the lease, deinitializing the engine platform on the last one
    pub fn release<E: Engine + ?Sized>(self, engine: &mut E) {
        let mut leases = self
            .platform
            .leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *leases = leases.saturating_sub(1);
        if *leases == 0 {
            engine.platform_deinit();
            tracing::debug!("platform deinitialized");
        }
    }
}
