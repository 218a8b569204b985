//! Receiving side of the share hand-off.
//!
//! The receiver runs where the OS delivers a share into the app (a share
//! extension, a share-target activation, an incoming intent). It reads every
//! attachment, copies files into the durable shared files directory and leaves
//! one pending share record behind for the main app to pick up.

mod attachment;
mod materialize;
mod resolve;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

pub use attachment::{
    Attachment, ExtensionItem, FileAttachment, LoadedItem, TextAttachment, UniformType,
    UrlAttachment,
};
pub use materialize::SharedFilesDir;

use crate::models::{SharedContent, SharedFile};
use crate::store::PendingShareStore;
use crate::Result;
use resolve::Extracted;

/// The OS request driving one receiver invocation.
pub trait ExtensionContext {
    fn input_items(&self) -> &[ExtensionItem];

    /// Reports a problem to the user. Contexts without a UI may only log it.
    fn show_error(&self, message: &str) {
        log::error!("{message}");
    }

    /// Opens a URL without waiting for the result.
    fn open_url(&self, url: &url::Url);

    /// Releases the request back to the OS.
    fn complete_request(&self);
}

/// How a receiver invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A payload was written to the store.
    Stored(SharedContent),
    /// Nothing usable was shared.
    Empty,
    /// Storage was unavailable or the write failed.
    Failed(String),
}

#[derive(Default)]
struct Accumulator {
    files: Vec<(usize, SharedFile)>,
    text: Option<(usize, String)>,
}

impl Accumulator {
    fn add(&mut self, index: usize, extracted: Extracted) {
        match extracted {
            Extracted::File(file) => self.files.push((index, file)),
            Extracted::Text(text) => match &self.text {
                Some((existing, _)) if *existing < index => {}
                _ => self.text = Some((index, text)),
            },
        }
    }

    fn into_content(mut self) -> Option<SharedContent> {
        self.files.sort_by_key(|(index, _)| *index);
        let files = self.files.into_iter().map(|(_, file)| file).collect();
        SharedContent::files(files)
            .or_else(|| self.text.map(|(_, text)| SharedContent::Text { text }))
    }
}

/// Extracts every attachment concurrently and combines the results.
///
/// Files keep their discovery order. Attachments that fail are skipped; if
/// nothing usable remains the result is `None`.
pub fn extract(items: &[ExtensionItem], files: &SharedFilesDir) -> Option<SharedContent> {
    let attachments: Vec<&dyn Attachment> = items
        .iter()
        .flat_map(|item| item.attachments.iter())
        .map(|attachment| attachment.as_ref())
        .collect();
    let accumulator = Mutex::new(Accumulator::default());
    let next = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..worker_count(attachments.len()) {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(attachment) = attachments.get(index) else {
                    break;
                };
                match resolve::resolve(*attachment, files) {
                    Ok(Some(extracted)) => accumulator
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .add(index, extracted),
                    Ok(None) => log::debug!("attachment {index} has no supported type"),
                    Err(e) => log::warn!("skipping attachment {index}: {e}"),
                }
            });
        }
    });

    accumulator
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_content()
}

/// Threads used for `attachments` items, bounded by the available parallelism.
fn worker_count(attachments: usize) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    attachments.min(cores)
}

/// Removes the copies made for `content` when no record will point at them.
fn discard(content: &SharedContent) {
    if let SharedContent::Files { files } = content {
        for file in files {
            if let Err(e) = std::fs::remove_file(&file.path) {
                log::debug!("could not remove orphaned copy {}: {e}", file.path);
            }
        }
    }
}

/// Writes shares into a [`PendingShareStore`] for the main app.
pub struct ExtensionReceiver<S> {
    store: S,
    wake_url: Option<url::Url>,
}

impl<S: PendingShareStore> ExtensionReceiver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            wake_url: None,
        }
    }

    /// URL opened after a share was stored, so a running instance rechecks the store.
    pub fn with_wake_url(mut self, url: Option<url::Url>) -> Self {
        self.wake_url = url;
        self
    }

    /// Extracts `items` and overwrites the pending record.
    pub fn receive(&self, items: &[ExtensionItem]) -> Result<Option<SharedContent>> {
        self.store.ensure_available()?;
        let files = SharedFilesDir::new(self.store.files_dir());
        let Some(content) = extract(items, &files) else {
            return Ok(None);
        };
        if let Err(e) = self.store.write(&content) {
            discard(&content);
            return Err(e);
        }
        Ok(Some(content))
    }

    /// Runs a full invocation: extract, store, wake the main app, complete the request.
    pub fn handle_request(&self, context: &dyn ExtensionContext) -> ReceiveOutcome {
        let outcome = match self.receive(context.input_items()) {
            Ok(Some(content)) => ReceiveOutcome::Stored(content),
            Ok(None) => ReceiveOutcome::Empty,
            Err(e) => {
                let message = format!("Failed to save shared content: {e}");
                context.show_error(&message);
                ReceiveOutcome::Failed(message)
            }
        };

        if let (ReceiveOutcome::Stored(_), Some(url)) = (&outcome, &self.wake_url) {
            context.open_url(url);
        }
        context.complete_request();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use crate::Error;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    struct FailingAttachment;

    impl Attachment for FailingAttachment {
        fn conforms_to(&self, ty: UniformType) -> bool {
            ty == UniformType::Data
        }

        fn load(&self, _ty: UniformType) -> Result<LoadedItem> {
            Err(Error::NativeApi("item provider failed".into()))
        }
    }

    /// Matches both Image and Url, like a photo shared from a gallery.
    struct GalleryImage(std::path::PathBuf);

    impl Attachment for GalleryImage {
        fn conforms_to(&self, ty: UniformType) -> bool {
            matches!(ty, UniformType::Image | UniformType::Url | UniformType::Data)
        }

        fn load(&self, ty: UniformType) -> Result<LoadedItem> {
            Ok(match ty {
                UniformType::Url => {
                    LoadedItem::Url("https://cdn.example.com/photo.jpg".parse().unwrap())
                }
                _ => LoadedItem::FileUrl(self.0.clone()),
            })
        }
    }

    struct RecordingContext {
        items: Vec<ExtensionItem>,
        errors: RefCell<Vec<String>>,
        opened: RefCell<Vec<url::Url>>,
        completed: RefCell<bool>,
    }

    impl RecordingContext {
        fn new(items: Vec<ExtensionItem>) -> Self {
            Self {
                items,
                errors: RefCell::default(),
                opened: RefCell::default(),
                completed: RefCell::new(false),
            }
        }
    }

    impl ExtensionContext for RecordingContext {
        fn input_items(&self) -> &[ExtensionItem] {
            &self.items
        }

        fn show_error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }

        fn open_url(&self, url: &url::Url) {
            self.opened.borrow_mut().push(url.clone());
        }

        fn complete_request(&self) {
            *self.completed.borrow_mut() = true;
        }
    }

    fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn files_item(paths: &[std::path::PathBuf]) -> ExtensionItem {
        ExtensionItem::new(
            paths
                .iter()
                .map(|p| Box::new(FileAttachment::new(p.clone())) as Box<dyn Attachment>)
                .collect(),
        )
    }

    #[test]
    fn files_keep_discovery_order_and_copy_sizes() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let sources: Vec<_> = (0..8)
            .map(|i| write_source(src.path(), &format!("file-{i}.txt"), &vec![b'x'; i + 1]))
            .collect();
        let files = SharedFilesDir::new(dest.path());

        let items = vec![files_item(&sources[..3]), files_item(&sources[3..])];
        let Some(SharedContent::Files { files: shared }) = extract(&items, &files) else {
            panic!("expected files");
        };

        let names: Vec<_> = shared.iter().map(|f| f.name.clone()).collect();
        let expected: Vec<_> = (0..8).map(|i| format!("file-{i}.txt")).collect();
        assert_eq!(names, expected);
        for (i, file) in shared.iter().enumerate() {
            assert_eq!(file.size, (i + 1) as u64);
            assert_eq!(fs::metadata(&file.path).unwrap().len(), file.size);
        }
    }

    #[test]
    fn text_is_passed_through_exactly() {
        let dest = tempfile::tempdir().unwrap();
        let raw = "  padded text\nwith a newline \t";
        let items = vec![ExtensionItem::new(vec![Box::new(TextAttachment(raw.into()))])];
        let content = extract(&items, &SharedFilesDir::new(dest.path()));
        assert_eq!(content, Some(SharedContent::text(raw)));
    }

    #[test]
    fn files_take_precedence_over_text() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let source = write_source(src.path(), "a.pdf", b"pdf");
        let items = vec![ExtensionItem::new(vec![
            Box::new(TextAttachment("caption".into())),
            Box::new(FileAttachment::new(source)),
        ])];
        let content = extract(&items, &SharedFilesDir::new(dest.path())).unwrap();
        assert!(matches!(content, SharedContent::Files { ref files } if files.len() == 1));
    }

    #[test]
    fn earliest_text_wins() {
        let dest = tempfile::tempdir().unwrap();
        let items = vec![ExtensionItem::new(vec![
            Box::new(TextAttachment("first".into())),
            Box::new(TextAttachment("second".into())),
            Box::new(TextAttachment("third".into())),
        ])];
        let content = extract(&items, &SharedFilesDir::new(dest.path()));
        assert_eq!(content, Some(SharedContent::text("first")));
    }

    #[test]
    fn failed_items_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let good = write_source(src.path(), "good.txt", b"ok");
        let items = vec![ExtensionItem::new(vec![
            Box::new(FailingAttachment),
            Box::new(FileAttachment::new(src.path().join("vanished.txt"))),
            Box::new(FileAttachment::new(good)),
        ])];
        let files_dir = SharedFilesDir::new(dest.path());
        let Some(SharedContent::Files { files }) = extract(&items, &files_dir) else {
            panic!("expected files");
        };
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "good.txt");
    }

    #[test]
    fn gallery_image_is_a_file_not_text() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let photo = write_source(src.path(), "photo.jpg", b"jpeg bytes");
        let items = vec![ExtensionItem::new(vec![Box::new(GalleryImage(photo))])];

        let content = extract(&items, &SharedFilesDir::new(dest.path())).unwrap();
        match content {
            SharedContent::Files { files } => assert_eq!(files[0].name, "photo.jpg"),
            SharedContent::Text { text } => panic!("image fell through to text: {text}"),
        }
    }

    #[test]
    fn all_failures_store_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let receiver = ExtensionReceiver::new(store.clone())
            .with_wake_url(Some("demo://sharekit-content".parse().unwrap()));
        let context = RecordingContext::new(vec![ExtensionItem::new(vec![
            Box::new(FailingAttachment),
            Box::new(FailingAttachment),
        ])]);

        assert_eq!(receiver.handle_request(&context), ReceiveOutcome::Empty);
        assert!(store.read().unwrap().is_none());
        assert!(context.opened.borrow().is_empty());
        assert!(*context.completed.borrow());
    }

    #[test]
    fn stored_share_wakes_main_app_then_completes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let wake: url::Url = "demo://sharekit-content".parse().unwrap();
        let receiver = ExtensionReceiver::new(store.clone()).with_wake_url(Some(wake.clone()));
        let context = RecordingContext::new(vec![ExtensionItem::new(vec![Box::new(TextAttachment(
            "hello".into(),
        ))])]);

        let outcome = receiver.handle_request(&context);
        assert_eq!(outcome, ReceiveOutcome::Stored(SharedContent::text("hello")));
        assert_eq!(store.read().unwrap(), Some(SharedContent::text("hello")));
        assert_eq!(*context.opened.borrow(), vec![wake]);
        assert!(*context.completed.borrow());
        assert!(context.errors.borrow().is_empty());
    }

    #[test]
    fn unavailable_storage_shows_error_and_does_not_wake() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let receiver = ExtensionReceiver::new(FileStore::new(blocker.join("store")))
            .with_wake_url(Some("demo://sharekit-content".parse().unwrap()));
        let context = RecordingContext::new(vec![ExtensionItem::new(vec![Box::new(TextAttachment(
            "hello".into(),
        ))])]);

        assert!(matches!(receiver.handle_request(&context), ReceiveOutcome::Failed(_)));
        assert_eq!(context.errors.borrow().len(), 1);
        assert!(context.opened.borrow().is_empty());
        assert!(*context.completed.borrow());
    }

    #[test]
    fn second_share_replaces_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let receiver = ExtensionReceiver::new(store.clone());
        receiver
            .receive(&[ExtensionItem::new(vec![Box::new(TextAttachment("one".into()))])])
            .unwrap();
        receiver
            .receive(&[ExtensionItem::new(vec![Box::new(TextAttachment("two".into()))])])
            .unwrap();
        assert_eq!(store.read().unwrap(), Some(SharedContent::text("two")));
    }

    /// Accepts `ensure_available` but refuses every record write.
    struct ReadOnlyStore(std::path::PathBuf);

    impl PendingShareStore for ReadOnlyStore {
        fn write(&self, _content: &SharedContent) -> Result<()> {
            Err(Error::StorageUnavailable("read-only volume".into()))
        }

        fn read(&self) -> Result<Option<SharedContent>> {
            Ok(None)
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }

        fn files_dir(&self) -> std::path::PathBuf {
            self.0.join("shared_files")
        }

        fn ensure_available(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_removes_copied_files() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let store = ReadOnlyStore(dest.path().to_path_buf());
        let sources = [
            write_source(src.path(), "a.txt", b"a"),
            write_source(src.path(), "b.txt", b"b"),
        ];

        let err = ExtensionReceiver::new(store).receive(&[files_item(&sources)]);
        assert!(matches!(err, Err(Error::StorageUnavailable(_))));

        let leftovers = fs::read_dir(dest.path().join("shared_files"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
        assert!(sources.iter().all(|source| source.exists()));
    }

    #[test]
    fn worker_count_is_bounded() {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        assert_eq!(worker_count(0), 0);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(500), cores.min(500));
    }

    #[test]
    fn large_share_keeps_order_with_few_workers() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let sources: Vec<_> = (0..64)
            .map(|i| write_source(src.path(), &format!("{i:02}.txt"), b"x"))
            .collect();

        let files_dir = SharedFilesDir::new(dest.path());
        let Some(SharedContent::Files { files }) = extract(&[files_item(&sources)], &files_dir)
        else {
            panic!("expected files");
        };
        let names: Vec<_> = files.iter().map(|f| f.name.clone()).collect();
        let expected: Vec<_> = (0..64).map(|i| format!("{i:02}.txt")).collect();
        assert_eq!(names, expected);
    }
}
