#![allow(unused_unsafe)]

use std::fs;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use objc2::{rc::Retained, runtime::AnyObject, AnyThread};
use objc2_app_kit::{NSSharingServicePicker, NSView};
use objc2_core_foundation::{CGPoint, CGRect, CGSize};
use objc2_foundation::{
    NSArray, NSData, NSFileManager, NSRectEdge, NSString, NSUserDefaults, NSURL,
};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use tauri::{Runtime, Window};

use super::focus;
use crate::config::Config;
use crate::models::{PreferredEdge, SharePosition, SharedContent};
use crate::outbound::{ShareOutcome, ShareRequest, ShareSheet};
use crate::store::{self, PendingShareStore, SHARED_FILES_DIR};
use crate::Error;

/// `UserDefaults` key the share extension writes the JSON record under.
const PENDING_KEY: &str = "pendingSharedContent";

/// `NSSharingServicePicker` anchored in the window's content view.
pub struct NativeSheet<R: Runtime> {
    window: Window<R>,
}

impl<R: Runtime> NativeSheet<R> {
    pub fn new(window: Window<R>) -> Self {
        Self { window }
    }
}

impl<R: Runtime> ShareSheet for NativeSheet<R> {
    // The picker has no cancel callback, so a dismissed picker counts as completed.
    fn present(&self, request: ShareRequest) -> Result<ShareOutcome, Error> {
        let dismissal = focus::watch_dismissal(&self.window)?;
        let (tx, rx) = mpsc::channel();
        let window = self.window.clone();

        let scheduled = self.window.run_on_main_thread(move || {
            let _ = tx.send(show_picker(&window, request));
        });
        if let Err(e) = scheduled {
            dismissal.cancel();
            return Err(e.into());
        }

        match rx.recv() {
            Ok(Ok(())) => {
                dismissal.wait();
                Ok(ShareOutcome::Completed)
            }
            Ok(Err(e)) => {
                dismissal.cancel();
                Err(e)
            }
            Err(_) => {
                dismissal.cancel();
                Err(Error::NativeApi(
                    "Main thread dropped the share request.".to_string(),
                ))
            }
        }
    }
}

fn show_picker<R: Runtime>(window: &Window<R>, request: ShareRequest) -> Result<(), Error> {
    let ns_view = get_ns_view(window)?;

    let (item, position): (Retained<AnyObject>, Option<SharePosition>) = match request {
        ShareRequest::Text { text, options } => {
            let ns_string = NSString::from_str(&text);
            (unsafe { Retained::cast_unchecked(ns_string) }, options.position)
        }
        ShareRequest::File { path, options } => {
            let path = NSString::from_str(&path.to_string_lossy());
            let ns_url = unsafe { NSURL::fileURLWithPath(&path) };
            (unsafe { Retained::cast_unchecked(ns_url) }, options.position)
        }
    };

    let items = NSArray::from_retained_slice(&[item]);
    let picker = unsafe {
        NSSharingServicePicker::initWithItems(NSSharingServicePicker::alloc(), &items)
    };

    let bounds = ns_view.bounds();
    let (origin, edge) = match position {
        Some(position) => (
            CGPoint::new(position.x, position.y),
            position.preferred_edge.map_or(NSRectEdge::NSMinYEdge, rect_edge),
        ),
        None => (
            CGPoint::new(bounds.size.width / 2.0, bounds.size.height / 2.0),
            NSRectEdge::NSMinYEdge,
        ),
    };
    let rect = CGRect::new(origin, CGSize::new(1.0, 1.0));
    unsafe {
        picker.showRelativeToRect_ofView_preferredEdge(rect, &ns_view, edge);
    }
    Ok(())
}

fn rect_edge(edge: PreferredEdge) -> NSRectEdge {
    match edge {
        PreferredEdge::Top => NSRectEdge::NSMaxYEdge,
        PreferredEdge::Bottom => NSRectEdge::NSMinYEdge,
        PreferredEdge::Left => NSRectEdge::NSMinXEdge,
        PreferredEdge::Right => NSRectEdge::NSMaxXEdge,
    }
}

/// Retrieves the native `NSView` from the Tauri window through `raw-window-handle`.
fn get_ns_view<R: Runtime>(window: &Window<R>) -> Result<Retained<NSView>, Error> {
    let handle = window
        .window_handle()
        .map_err(|e| Error::NativeApi(e.to_string()))?;
    match handle.as_raw() {
        RawWindowHandle::AppKit(handle) => {
            let ns_view_ptr = handle.ns_view.as_ptr();
            unsafe { Retained::retain(ns_view_ptr.cast::<NSView>()) }
                .ok_or_else(|| Error::NativeApi("Window has no content view.".to_string()))
        }
        _ => Err(Error::NativeApi(
            "Unsupported window handle type on macOS.".to_string(),
        )),
    }
}

/// The store a share extension in the same App Group writes to, when the app
/// is entitled to one.
pub fn shared_store(identifier: &str, config: &Config) -> Option<Arc<dyn PendingShareStore>> {
    let group = config
        .app_group
        .clone()
        .unwrap_or_else(|| format!("group.{identifier}"));
    let container = group_container(&group)?;
    Some(Arc::new(DefaultsStore::new(group, container)))
}

fn group_container(group: &str) -> Option<PathBuf> {
    let file_manager = unsafe { NSFileManager::defaultManager() };
    let container = unsafe {
        file_manager.containerURLForSecurityApplicationGroupIdentifier(&NSString::from_str(group))
    }?;
    let path = unsafe { container.path() }?;
    Some(PathBuf::from(path.to_string()))
}

/// Pending share kept in the App Group's `UserDefaults`.
///
/// Layout, shared with the share extension:
/// ```text
/// UserDefaults(suiteName: <group>)["pendingSharedContent"] = <JSON record as Data>
/// <group container>/shared_files/<uuid>_<name>
/// ```
#[derive(Debug, Clone)]
pub struct DefaultsStore {
    suite: String,
    container: PathBuf,
}

impl DefaultsStore {
    pub fn new(suite: impl Into<String>, container: impl Into<PathBuf>) -> Self {
        Self {
            suite: suite.into(),
            container: container.into(),
        }
    }

    fn defaults(&self) -> Result<Retained<NSUserDefaults>, Error> {
        let suite = NSString::from_str(&self.suite);
        unsafe { NSUserDefaults::initWithSuiteName(NSUserDefaults::alloc(), Some(&suite)) }
            .ok_or_else(|| {
                Error::StorageUnavailable(format!("App Group {} is not configured", self.suite))
            })
    }
}

impl PendingShareStore for DefaultsStore {
    fn write(&self, content: &SharedContent) -> Result<(), Error> {
        let defaults = self.defaults()?;
        let key = NSString::from_str(PENDING_KEY);
        if unsafe { defaults.dataForKey(&key) }.is_some() {
            log::debug!(
                "overwriting unclaimed share in {}; its files stay until clear",
                self.suite
            );
        }

        let data = NSData::with_bytes(&serde_json::to_vec(content)?);
        let object: &AnyObject = &data;
        unsafe {
            defaults.setObject_forKey(Some(object), &key);
            defaults.synchronize();
        }
        Ok(())
    }

    fn read(&self) -> Result<Option<SharedContent>, Error> {
        let defaults = self.defaults()?;
        let key = NSString::from_str(PENDING_KEY);
        match unsafe { defaults.dataForKey(&key) } {
            Some(data) => store::decode_record(&data.to_vec()),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<(), Error> {
        let defaults = self.defaults()?;
        unsafe {
            defaults.removeObjectForKey(&NSString::from_str(PENDING_KEY));
            defaults.synchronize();
        }
        store::remove_files_dir(&self.files_dir())
    }

    fn files_dir(&self) -> PathBuf {
        self.container.join(SHARED_FILES_DIR)
    }

    fn ensure_available(&self) -> Result<(), Error> {
        self.defaults()?;
        fs::create_dir_all(&self.container).map_err(|e| {
            Error::StorageUnavailable(format!("{}: {}", self.container.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(container: &std::path::Path) -> DefaultsStore {
        let suite = format!("app.tauri.sharekit.tests.{}", uuid::Uuid::new_v4());
        DefaultsStore::new(suite, container)
    }

    #[test]
    fn record_written_by_an_extension_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = scratch_store(dir.path());
        let defaults = store.defaults().unwrap();
        let data = NSData::with_bytes(br#"{"type":"text","text":"from extension"}"#);
        let object: &AnyObject = &data;
        unsafe { defaults.setObject_forKey(Some(object), &NSString::from_str(PENDING_KEY)) };

        assert_eq!(store.read().unwrap(), Some(SharedContent::text("from extension")));
        store.clear().unwrap();
    }

    #[test]
    fn clear_drops_record_and_shared_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = scratch_store(dir.path());
        store.ensure_available().unwrap();
        fs::create_dir_all(store.files_dir()).unwrap();
        fs::write(store.files_dir().join("copy.txt"), b"x").unwrap();
        store.write(&SharedContent::text("pending")).unwrap();

        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
        assert!(!store.files_dir().exists());
        store.clear().unwrap();
    }

    #[test]
    fn malformed_defaults_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = scratch_store(dir.path());
        let defaults = store.defaults().unwrap();
        let data = NSData::with_bytes(b"[");
        let object: &AnyObject = &data;
        unsafe { defaults.setObject_forKey(Some(object), &NSString::from_str(PENDING_KEY)) };

        assert!(matches!(store.read(), Err(Error::MalformedRecord(_))));
        store.clear().unwrap();
    }
}
