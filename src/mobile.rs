use serde::de::DeserializeOwned;
use tauri::{
    plugin::{PluginApi, PluginHandle},
    AppHandle, Runtime, Window,
};

use crate::outbound::{self, ShareOutcome, ShareRequest, ShareSheet};
use crate::{models::*, Result};

#[cfg(target_os = "android")]
const PLUGIN_IDENTIFIER: &str = "app.tauri.sharekit";

#[cfg(target_os = "ios")]
tauri::ios_plugin_binding!(init_plugin_sharekit);

// initializes the Kotlin or Swift plugin classes
pub fn init<R: Runtime, C: DeserializeOwned>(
    _app: &AppHandle<R>,
    api: PluginApi<R, C>,
) -> Result<ShareKit<R>> {
    #[cfg(target_os = "android")]
    let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "ShareKitPlugin")?;
    #[cfg(target_os = "ios")]
    let handle = api.register_ios_plugin(init_plugin_sharekit)?;
    Ok(ShareKit(handle))
}

/// Access to the sharekit APIs. The native plugin owns the store and the
/// share extension; calls are forwarded to it.
pub struct ShareKit<R: Runtime>(PluginHandle<R>);

impl<R: Runtime> ShareKit<R> {
    pub fn share_text(
        &self,
        _window: Window<R>,
        text: String,
        options: ShareTextOptions,
    ) -> Result<()> {
        outbound::share_text(&NativeSheet(&self.0), text, options)
    }

    pub fn share_file(
        &self,
        _window: Window<R>,
        url: String,
        options: ShareFileOptions,
    ) -> Result<()> {
        outbound::share_file(&NativeSheet(&self.0), &url, options)
    }

    pub fn get_pending_shared_content(&self) -> Result<Option<SharedContent>> {
        self.0
            .run_mobile_plugin("getPendingSharedContent", ())
            .map_err(Into::into)
    }

    pub fn clear_pending_shared_content(&self) -> Result<()> {
        self.0
            .run_mobile_plugin("clearPendingSharedContent", ())
            .map_err(Into::into)
    }
}

/// The native plugin's share sheet. Dismissal comes back as a rejected
/// invoke, which converts to `Error::Cancelled`.
struct NativeSheet<'a, R: Runtime>(&'a PluginHandle<R>);

impl<R: Runtime> ShareSheet for NativeSheet<'_, R> {
    fn present(&self, request: ShareRequest) -> Result<ShareOutcome> {
        match request {
            ShareRequest::Text { text, options } => self
                .0
                .run_mobile_plugin::<()>("shareText", ShareTextPayload { text, options })?,
            ShareRequest::File { path, options } => {
                let url = outbound::file_url(&path);
                self.0
                    .run_mobile_plugin::<()>("shareFile", ShareFilePayload { url, options })?
            }
        }
        Ok(ShareOutcome::Completed)
    }
}
