use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide emergency switch. When engaged every request is allowed
/// without touching any collaborator.
///
/// Starts from the configured position; clones share state, so the signal
/// watcher in `ops::signals` can flip it under a running engine.
#[derive(Debug, Clone, Default)]
pub struct KillSwitch {
    engaged: Arc<AtomicBool>,
}

impl KillSwitch {
    pub fn new(engaged: bool) -> Self {
        Self { engaged: Arc::new(AtomicBool::new(engaged)) }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Relaxed)
    }

    pub fn engage(&self) {
        self.engaged.store(true, Ordering::Relaxed);
        tracing::warn!("kill switch engaged: all requests will be allowed");
    }

    pub fn release(&self) {
        self.engaged.store(false, Ordering::Relaxed);
        tracing::info!("kill switch released");
    }
}
