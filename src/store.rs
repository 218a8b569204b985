use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::models::SharedContent;
use crate::{Error, Result};

const RECORD_FILE: &str = "pending_shared_content.json";
pub(crate) const SHARED_FILES_DIR: &str = "shared_files";

/// Single-slot storage for the most recent unclaimed share.
///
/// Written by the receiving side, read and cleared by the main app. There is
/// no queue: a second `write` replaces the first record.
pub trait PendingShareStore: Send + Sync {
    /// Replaces the current record.
    fn write(&self, content: &SharedContent) -> Result<()>;

    /// Returns the current record without changing it.
    fn read(&self) -> Result<Option<SharedContent>>;

    /// Removes the record along with the shared files directory.
    fn clear(&self) -> Result<()>;

    /// Directory that holds the durable copies referenced by the record.
    fn files_dir(&self) -> PathBuf;

    /// Checks that the storage area can be used at all.
    fn ensure_available(&self) -> Result<()>;
}

impl<S: PendingShareStore + ?Sized> PendingShareStore for Arc<S> {
    fn write(&self, content: &SharedContent) -> Result<()> {
        (**self).write(content)
    }

    fn read(&self) -> Result<Option<SharedContent>> {
        (**self).read()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn files_dir(&self) -> PathBuf {
        (**self).files_dir()
    }

    fn ensure_available(&self) -> Result<()> {
        (**self).ensure_available()
    }
}

/// A [`PendingShareStore`] backed by a directory both processes can reach.
///
/// Layout:
/// ```text
/// <root>/pending_shared_content.json
/// <root>/shared_files/<uuid>_<name>
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_FILE)
    }
}

impl PendingShareStore for FileStore {
    fn write(&self, content: &SharedContent) -> Result<()> {
        self.ensure_available()?;
        let bytes = serde_json::to_vec(content)?;

        let record = self.record_path();
        if record.exists() {
            // TODO: delete files from the superseded record once nothing can still be reading them.
            log::debug!(
                "overwriting unclaimed share in {}; its files stay until clear",
                self.root.display()
            );
        }

        // Stage next to the record so the rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&record).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn read(&self) -> Result<Option<SharedContent>> {
        let bytes = match fs::read(self.record_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_record(&bytes)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(self.record_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        remove_files_dir(&self.files_dir())
    }

    fn files_dir(&self) -> PathBuf {
        self.root.join(SHARED_FILES_DIR)
    }

    fn ensure_available(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            Error::StorageUnavailable(format!("{}: {}", self.root.display(), e))
        })
    }
}

/// Decodes a JSON record. A record without files counts as no share.
pub(crate) fn decode_record(bytes: &[u8]) -> Result<Option<SharedContent>> {
    let content: SharedContent =
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedRecord(e.to_string()))?;
    Ok(Some(content).filter(SharedContent::is_deliverable))
}

pub(crate) fn remove_files_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
