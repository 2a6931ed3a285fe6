//! Connectivity status port.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the client currently believes it is online
///
/// Consulted only after retries are exhausted to decide between queueing a
/// request and surfacing its error.
pub trait ConnectivityStatus: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Fixed or manually toggled connectivity, mostly for tests and tools
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self { online: AtomicBool::new(online) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityStatus for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
