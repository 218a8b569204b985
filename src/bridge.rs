use crate::config::Config;
use crate::models::SharedContent;
use crate::store::PendingShareStore;
use crate::Result;

/// Event name used to push shared content to the webview.
pub const SHARED_CONTENT_EVENT: &str = "sharedContent";

/// Delivers pushed content to whoever listens on the application side.
pub trait Notifier: Send + Sync {
    /// Returns how many listeners received `content`.
    fn notify(&self, event: &str, content: &SharedContent) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    /// Content is waiting but has not been pushed yet.
    PendingAvailable,
    /// Content reached at least one listener and the app has not cleared it.
    Delivered,
}

/// Inputs to the bridge. Lifecycle and wake events carry no data; they only
/// ask the bridge to look at the store again.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// Cold start or resume of the main app.
    Activated,
    /// A URL was opened on the app; only the share wake URL counts.
    WakeSignal(url::Url),
    /// The OS delivered a share straight to this process. It takes the store
    /// slot like any other share.
    DirectShare(SharedContent),
    /// The app consumed the pending share.
    Cleared,
}

/// Main-app side of the hand-off: polls and pushes the pending share.
pub struct MainAppBridge<S, N> {
    store: S,
    notifier: N,
    config: Config,
    state: BridgeState,
}

impl<S: PendingShareStore, N: Notifier> MainAppBridge<S, N> {
    pub fn new(store: S, notifier: N, config: Config) -> Self {
        Self {
            store,
            notifier,
            config,
            state: BridgeState::Idle,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies `event`, returning the content pushed as a result, if any.
    pub fn dispatch(&mut self, event: BridgeEvent) -> Result<Option<SharedContent>> {
        match event {
            BridgeEvent::Activated => Ok(self.recheck()),
            BridgeEvent::WakeSignal(url) => {
                if self.config.is_wake_url(&url) {
                    Ok(self.recheck())
                } else {
                    log::debug!("ignoring unrelated url {url}");
                    Ok(None)
                }
            }
            BridgeEvent::DirectShare(content) => {
                self.store.write(&content)?;
                self.state = BridgeState::PendingAvailable;
                self.push(&content);
                Ok(Some(content))
            }
            BridgeEvent::Cleared => {
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Poll answer: the most recent share, whichever side wrote it.
    pub fn pending(&self) -> Result<Option<SharedContent>> {
        self.store.read()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.state = BridgeState::Idle;
        self.store.clear()
    }

    fn recheck(&mut self) -> Option<SharedContent> {
        let content = match self.pending() {
            Ok(Some(content)) => content,
            Ok(None) => {
                self.state = BridgeState::Idle;
                return None;
            }
            Err(e) => {
                log::warn!("treating unreadable pending share as empty: {e}");
                return None;
            }
        };
        if self.state == BridgeState::Idle {
            self.state = BridgeState::PendingAvailable;
        }
        self.push(&content);
        Some(content)
    }

    fn push(&mut self, content: &SharedContent) {
        match self.notifier.notify(SHARED_CONTENT_EVENT, content) {
            Ok(0) => log::debug!("no listener for {SHARED_CONTENT_EVENT} yet; share stays pending"),
            Ok(_) => self.state = BridgeState::Delivered,
            Err(e) => log::warn!("failed to push shared content: {e}"),
        }
    }
}
