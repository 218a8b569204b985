use std::sync::{Mutex, MutexGuard};

use crate::bridge::{BridgeEvent, BridgeState, MainAppBridge, Notifier};
use crate::models::SharedContent;
use crate::store::PendingShareStore;
use crate::Result;

/// The bridge as managed plugin state, shared between commands and lifecycle callbacks.
pub struct SharedBridge<S, N> {
    inner: Mutex<MainAppBridge<S, N>>,
}

impl<S: PendingShareStore, N: Notifier> SharedBridge<S, N> {
    pub fn new(bridge: MainAppBridge<S, N>) -> Self {
        Self {
            inner: Mutex::new(bridge),
        }
    }

    pub fn dispatch(&self, event: BridgeEvent) -> Result<Option<SharedContent>> {
        self.lock().dispatch(event)
    }

    pub fn pending(&self) -> Result<Option<SharedContent>> {
        self.lock().pending()
    }

    pub fn clear(&self) -> Result<()> {
        self.lock().clear()
    }

    pub fn state(&self) -> BridgeState {
        self.lock().state()
    }

    /// Runs `f` with the store while holding the bridge lock.
    pub fn with_store<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(self.lock().store())
    }

    fn lock(&self) -> MutexGuard<'_, MainAppBridge<S, N>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("share bridge mutex was poisoned; continuing");
                poisoned.into_inner()
            }
        }
    }
}
