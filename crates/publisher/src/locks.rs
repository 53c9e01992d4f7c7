use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use storekit_core::error::{Error, Result};

/// Serializes publish attempts per store.
///
/// Two concurrent publishes of one store would race on provider-side project
/// state, so the second caller is rejected immediately with `Busy` rather
/// than queued. The guard spans the whole attempt, cleanup included.
#[derive(Debug, Default, Clone)]
pub struct LockRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim a store for publishing. Fails fast when an attempt is
    /// already running.
    pub fn try_acquire(&self, store_id: &str) -> Result<PublishGuard> {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !active.insert(store_id.to_string()) {
            return Err(Error::Busy(format!(
                "publish already in progress for store {}",
                store_id
            )));
        }
        Ok(PublishGuard {
            store_id: store_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }
}

/// Releases the store on drop, whatever the outcome of the attempt.
#[derive(Debug)]
pub struct PublishGuard {
    store_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for PublishGuard {
    fn drop(&mut self) {
        // Release unconditionally, poisoned or not; a store must never stay
        // Busy after its guard is gone.
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.remove(&self.store_id);
    }
}
