use std::cell::RefCell;
use std::path::Path;
use std::sync::{mpsc, Arc};

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use tauri::{Runtime, Window};
use windows::{
    core::{Interface, HSTRING},
    ApplicationModel::DataTransfer::{DataRequestedEventArgs, DataTransferManager},
    Foundation::TypedEventHandler,
    Storage::{IStorageItem, StorageFile},
    Win32::{
        Foundation::HWND,
        System::WinRT::{RoInitialize, RO_INIT_SINGLETHREADED},
        UI::Shell::IDataTransferManagerInterop,
    },
};
use windows_collections::IIterable;

use crate::config::Config;
use crate::outbound::{ShareOutcome, ShareRequest, ShareSheet};
use crate::store::PendingShareStore;
use crate::Error;

type Completion = mpsc::Sender<Result<ShareOutcome, Error>>;

// Keeps the DataTransferManager and its DataRequested registration alive until
// the handler has run. Only touched on the main thread.
thread_local! {
    static SHARE_REGISTRATION: RefCell<Option<(DataTransferManager, i64)>> =
        const { RefCell::new(None) };
}

impl From<windows::core::Error> for Error {
    fn from(err: windows::core::Error) -> Self {
        Error::NativeApi(err.message().to_string())
    }
}

/// The Windows share UI, driven through `DataTransferManager`.
pub struct NativeSheet<R: Runtime> {
    window: Window<R>,
}

impl<R: Runtime> NativeSheet<R> {
    pub fn new(window: Window<R>) -> Self {
        Self { window }
    }
}

impl<R: Runtime> ShareSheet for NativeSheet<R> {
    fn present(&self, request: ShareRequest) -> Result<ShareOutcome, Error> {
        let (setup_tx, setup_rx) = mpsc::channel::<Result<(), Error>>();
        let (done_tx, done_rx) = mpsc::channel();
        let window = self.window.clone();
        let app_name = self.window.app_handle().package_info().name.clone();

        self.window.run_on_main_thread(move || {
            let _ = setup_tx.send(show_share_ui(&window, request, app_name, done_tx));
        })?;

        setup_rx.recv().map_err(|_| {
            Error::NativeApi("Failed to receive result from main thread".to_string())
        })??;

        // Waits for ShareCompleted or ShareCanceled.
        done_rx.recv().map_err(|_| {
            Error::NativeApi("Share UI closed without reporting a result".to_string())
        })?
    }
}

fn show_share_ui<R: Runtime>(
    window: &Window<R>,
    request: ShareRequest,
    app_name: String,
    done: Completion,
) -> Result<(), Error> {
    initialize_winrt_thread()?;
    let hwnd = get_hwnd(window)?;
    let (dtm, interop) = get_data_transfer_manager(hwnd)?;

    let handler: TypedEventHandler<DataTransferManager, DataRequestedEventArgs> =
        TypedEventHandler::new(
            move |_, args: windows::core::Ref<'_, DataRequestedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    if let Err(e) = fill_data_package(args, &request, &app_name, &done) {
                        let _ = done.send(Err(e.into()));
                    }
                }
                release_registration();
                Ok(())
            },
        );

    release_registration();
    let token = dtm.DataRequested(&handler)?;
    SHARE_REGISTRATION.with(|registration| {
        *registration.borrow_mut() = Some((dtm, token));
    });

    unsafe { interop.ShowShareUIForWindow(hwnd) }?;
    Ok(())
}

fn fill_data_package(
    args: &DataRequestedEventArgs,
    request: &ShareRequest,
    app_name: &str,
    done: &Completion,
) -> windows::core::Result<()> {
    let data = args.Request()?.Data()?;
    let properties = data.Properties()?;

    match request {
        ShareRequest::Text { text, options } => {
            // Title and description are required for the share UI to list targets.
            let title = options.title.as_deref().unwrap_or(app_name);
            properties.SetTitle(&HSTRING::from(title))?;
            properties.SetDescription(&HSTRING::from(text.as_str()))?;
            data.SetText(&HSTRING::from(text.as_str()))?;
        }
        ShareRequest::File { path, options } => {
            let title = options
                .title
                .clone()
                .unwrap_or_else(|| display_name(path).unwrap_or_else(|| app_name.to_string()));
            properties.SetTitle(&HSTRING::from(title.as_str()))?;
            properties.SetDescription(&HSTRING::from(title.as_str()))?;

            let path = HSTRING::from(path.to_string_lossy().into_owned());
            let file = StorageFile::GetFileFromPathAsync(&path)?.get()?;
            let item = file.cast::<IStorageItem>()?;
            let items: IIterable<IStorageItem> = vec![Some(item)].into();
            data.SetStorageItemsReadOnly(&items)?;
        }
    }

    let completed = done.clone();
    data.ShareCompleted(&TypedEventHandler::new(move |_, _| {
        let _ = completed.send(Ok(ShareOutcome::Completed));
        Ok(())
    }))?;
    let cancelled = done.clone();
    data.ShareCanceled(&TypedEventHandler::new(move |_, _| {
        let _ = cancelled.send(Ok(ShareOutcome::Cancelled));
        Ok(())
    }))?;
    Ok(())
}

fn display_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

fn release_registration() {
    SHARE_REGISTRATION.with(|registration| {
        if let Some((manager, token)) = registration.borrow_mut().take() {
            let _ = manager.RemoveDataRequested(token);
        }
    });
}

/// Initializes the Windows Runtime on the current thread.
fn initialize_winrt_thread() -> Result<(), Error> {
    // Returns S_FALSE when the thread is already initialized, which is fine.
    unsafe { RoInitialize(RO_INIT_SINGLETHREADED) }
        .map_err(|e| Error::NativeApi(format!("Failed to initialize WinRT: {}", e)))
}

/// Retrieves the native window handle (HWND) from the Tauri window.
fn get_hwnd<R: Runtime>(window: &Window<R>) -> Result<HWND, Error> {
    let handle = window
        .window_handle()
        .map_err(|e| Error::NativeApi(e.to_string()))?;

    match handle.as_raw() {
        RawWindowHandle::Win32(handle) => Ok(HWND(handle.hwnd.get() as *mut std::ffi::c_void)),
        _ => Err(Error::NativeApi("Unsupported window handle type".to_string())),
    }
}

/// Gets the DataTransferManager bound to the window, as desktop (non-UWP) apps must.
fn get_data_transfer_manager(
    hwnd: HWND,
) -> Result<(DataTransferManager, IDataTransferManagerInterop), Error> {
    let interop = windows::core::factory::<DataTransferManager, IDataTransferManagerInterop>()?;
    let dtm = unsafe { interop.GetForWindow(hwnd) }?;
    Ok((dtm, interop))
}

/// Windows has no App Group equivalent; the app data directory is shared instead.
pub fn shared_store(_identifier: &str, _config: &Config) -> Option<Arc<dyn PendingShareStore>> {
    None
}
