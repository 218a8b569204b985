use std::sync::Arc;

use tauri::{plugin::PluginApi, AppHandle, Manager, Runtime, Window};
use url::Url;

use crate::bridge::{BridgeEvent, BridgeState, MainAppBridge};
use crate::config::Config;
use crate::intent::{self, ActivationContext, ShareIntent};
use crate::listeners::Listeners;
use crate::models::*;
use crate::outbound;
use crate::platform;
use crate::receiver::{ExtensionReceiver, ReceiveOutcome, SharedFilesDir};
use crate::state::SharedBridge;
use crate::store::{FileStore, PendingShareStore};
use crate::Result;

const STORE_DIR: &str = "sharekit";

pub fn init<R: Runtime>(
    app: &AppHandle<R>,
    api: PluginApi<R, Option<Config>>,
) -> Result<ShareKit<R>> {
    let config = api.config().clone().unwrap_or_default();
    let store = open_store(app, &config)?;

    let listeners = Listeners::new();
    let bridge = MainAppBridge::new(store, listeners.clone(), config.clone());
    Ok(ShareKit {
        app: app.clone(),
        config,
        listeners,
        bridge: SharedBridge::new(bridge),
    })
}

type Store = Arc<dyn PendingShareStore>;

fn open_store<R: Runtime>(app: &AppHandle<R>, config: &Config) -> Result<Store> {
    if let Some(dir) = &config.storage_dir {
        log::debug!("pending shares live in {}", dir.display());
        return Ok(Arc::new(FileStore::new(dir.clone())));
    }
    if let Some(store) = platform::shared_store(&app.config().identifier, config) {
        log::debug!("pending shares live in the App Group");
        return Ok(store);
    }
    if cfg!(target_os = "macos") {
        log::warn!("no App Group container available; shares from an extension will not arrive");
    }
    let root = app.path().app_local_data_dir()?.join(STORE_DIR);
    log::debug!("pending shares live in {}", root.display());
    Ok(Arc::new(FileStore::new(root)))
}

/// Access to the sharekit APIs.
pub struct ShareKit<R: Runtime> {
    app: AppHandle<R>,
    config: Config,
    listeners: Listeners,
    bridge: SharedBridge<Store, Listeners>,
}

impl<R: Runtime> ShareKit<R> {
    pub fn share_text(
        &self,
        window: Window<R>,
        text: String,
        options: ShareTextOptions,
    ) -> Result<()> {
        outbound::share_text(&platform::NativeSheet::new(window), text, options)
    }

    pub fn share_file(
        &self,
        window: Window<R>,
        url: String,
        options: ShareFileOptions,
    ) -> Result<()> {
        outbound::share_file(&platform::NativeSheet::new(window), &url, options)
    }

    pub fn get_pending_shared_content(&self) -> Result<Option<SharedContent>> {
        self.bridge.pending()
    }

    pub fn clear_pending_shared_content(&self) -> Result<()> {
        self.bridge.dispatch(BridgeEvent::Cleared).map(|_| ())
    }

    /// Rechecks the store after `url` was opened on the app.
    ///
    /// Call this from a deep-link or single-instance handler. URLs other than
    /// `<urlScheme>://sharekit-content` are ignored.
    pub fn handle_wake_url(&self, url: &Url) -> Result<Option<SharedContent>> {
        self.bridge.dispatch(BridgeEvent::WakeSignal(url.clone()))
    }

    /// Stores a share passed on the command line after `--share-target`.
    ///
    /// Returns `false` when `args` carry no share-target flag. On `true` the
    /// process has done its job as a share target and may exit; a running
    /// instance is woken through the configured URL scheme.
    ///
    /// ```rust,no_run
    /// # fn setup(app: &tauri::App) {
    /// use tauri_plugin_sharekit::ShareExt;
    ///
    /// if app.share().handle_share_activation(std::env::args()) {
    ///     app.handle().exit(0);
    /// }
    /// # }
    /// ```
    pub fn handle_share_activation<I, S>(&self, args: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(items) = intent::activation_items(args) else {
            return false;
        };
        let receiver = ExtensionReceiver::new(self.bridge.with_store(Arc::clone))
            .with_wake_url(self.config.wake_url());
        match receiver.handle_request(&ActivationContext::new(items)) {
            ReceiveOutcome::Stored(content) => {
                log::debug!("stored share-target content: {content:?}")
            }
            ReceiveOutcome::Empty => log::debug!("share-target activation carried nothing usable"),
            ReceiveOutcome::Failed(_) => {}
        }
        true
    }

    /// Delivers a share the OS handed to this process, pushing it to listeners.
    pub fn handle_direct_share(&self, intent: ShareIntent) -> Result<Option<SharedContent>> {
        let dir = self.bridge.with_store(|store| {
            store.ensure_available()?;
            Ok::<_, crate::Error>(store.files_dir())
        })?;
        let Some(content) = intent.extract(&SharedFilesDir::new(dir)) else {
            log::debug!("direct share carried nothing usable");
            return Ok(None);
        };
        self.bridge.dispatch(BridgeEvent::DirectShare(content))
    }

    pub fn bridge_state(&self) -> BridgeState {
        self.bridge.state()
    }

    pub fn app(&self) -> &AppHandle<R> {
        &self.app
    }

    pub(crate) fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub(crate) fn activate(&self) {
        if let Err(e) = self.bridge.dispatch(BridgeEvent::Activated) {
            log::warn!("pending share check failed: {e}");
        }
    }
}
