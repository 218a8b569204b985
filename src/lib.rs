//! # tauri-plugin-sharekit
//!
//! A Tauri plugin that opens the native share sheet and receives content other
//! apps share into yours.
//!
//! Outbound, `shareText` and `shareFile` present the system share UI on
//! Windows, macOS, iOS and Android. Inbound, a share extension (or share
//! target, or incoming intent) drops what it received into a single pending
//! record; the app polls it with `getPendingSharedContent` or listens for the
//! `sharedContent` event, and removes it with `clearPendingSharedContent`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tauri_plugin_sharekit::ShareExt;
//!
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(tauri_plugin_sharekit::init())
//!         .setup(|app| {
//!             // Launched by the OS as a share target: store the share and quit.
//!             if app.share().handle_share_activation(std::env::args()) {
//!                 app.handle().exit(0);
//!             }
//!             Ok(())
//!         })
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! ```js
//! import { getPendingSharedContent, onSharedContent, clearPendingSharedContent } from 'tauri-plugin-sharekit-api';
//!
//! const pending = await getPendingSharedContent();
//! await onSharedContent(async (content) => {
//!   console.log(content.type);
//!   await clearPendingSharedContent();
//! });
//! ```
//!
//! ## Configuration
//!
//! See [`Config`] for the `plugins.sharekit` section of `tauri.conf.json`.

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

pub use models::*;

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

mod commands;
mod error;
#[cfg(desktop)]
mod listeners;
mod models;
mod platform;

pub mod bridge;
pub mod config;
pub mod intent;
pub mod outbound;
pub mod receiver;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};

#[cfg(desktop)]
pub use desktop::ShareKit;
#[cfg(mobile)]
pub use mobile::ShareKit;

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the sharekit APIs.
pub trait ShareExt<R: Runtime> {
    fn share(&self) -> &ShareKit<R>;
}

impl<R: Runtime, T: Manager<R>> crate::ShareExt<R> for T {
    fn share(&self) -> &ShareKit<R> {
        self.state::<ShareKit<R>>().inner()
    }
}

/// Initializes the plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    let builder = Builder::<R, Option<Config>>::new("sharekit");

    #[cfg(desktop)]
    let builder = builder
        .invoke_handler(tauri::generate_handler![
            commands::share_text,
            commands::share_file,
            commands::get_pending_shared_content,
            commands::clear_pending_shared_content,
            listeners::register_listener,
            listeners::remove_listener,
        ])
        .on_event(lifecycle::on_run_event);

    #[cfg(mobile)]
    let builder = builder.invoke_handler(tauri::generate_handler![
        commands::share_text,
        commands::share_file,
        commands::get_pending_shared_content,
        commands::clear_pending_shared_content,
    ]);

    builder
        .setup(|app, api| {
            #[cfg(mobile)]
            let share = mobile::init(app, api)?;
            #[cfg(desktop)]
            let share = {
                let share = desktop::init(app, api)?;
                app.manage(share.listeners().clone());
                share
            };
            app.manage(share);
            Ok(())
        })
        .build()
}

#[cfg(desktop)]
mod lifecycle {
    use tauri::{AppHandle, Manager, RunEvent, Runtime};

    use crate::ShareKit;

    pub(crate) fn on_run_event<R: Runtime>(app: &AppHandle<R>, event: &RunEvent) {
        let Some(share) = app.try_state::<ShareKit<R>>() else {
            return;
        };
        match event {
            RunEvent::Ready | RunEvent::Resumed => share.activate(),
            #[cfg(target_os = "macos")]
            RunEvent::Opened { urls } => {
                for url in urls {
                    if let Err(e) = share.handle_wake_url(url) {
                        log::warn!("wake url {url} not handled: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}
