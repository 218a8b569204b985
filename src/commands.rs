use tauri::{command, AppHandle, Runtime, Window};

use crate::{models::*, Result, ShareExt};

#[command]
pub(crate) async fn share_text<R: Runtime>(
    app: AppHandle<R>,
    window: Window<R>,
    text: String,
    mime_type: Option<String>,
    title: Option<String>,
    position: Option<SharePosition>,
) -> Result<()> {
    let options = ShareTextOptions {
        mime_type,
        title,
        position,
    };
    app.share().share_text(window, text, options)
}

#[command]
pub(crate) async fn share_file<R: Runtime>(
    app: AppHandle<R>,
    window: Window<R>,
    url: String,
    mime_type: Option<String>,
    title: Option<String>,
    position: Option<SharePosition>,
) -> Result<()> {
    let options = ShareFileOptions {
        mime_type,
        title,
        position,
    };
    app.share().share_file(window, url, options)
}

#[command]
pub(crate) async fn get_pending_shared_content<R: Runtime>(
    app: AppHandle<R>,
) -> Result<Option<SharedContent>> {
    app.share().get_pending_shared_content()
}

#[command]
pub(crate) async fn clear_pending_shared_content<R: Runtime>(app: AppHandle<R>) -> Result<()> {
    app.share().clear_pending_shared_content()
}
