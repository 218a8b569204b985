use std::sync::Arc;

use tauri::{Runtime, Window};

use crate::config::Config;
use crate::outbound::{ShareOutcome, ShareRequest, ShareSheet};
use crate::store::PendingShareStore;
use crate::Error;

/// There is no system share sheet to drive on Linux.
pub struct NativeSheet;

impl NativeSheet {
    pub fn new<R: Runtime>(_window: Window<R>) -> Self {
        NativeSheet
    }
}

impl ShareSheet for NativeSheet {
    fn present(&self, _request: ShareRequest) -> Result<ShareOutcome, Error> {
        Err(Error::UnsupportedPlatform)
    }
}

/// No cross-process container exists; the app data directory is used instead.
pub fn shared_store(_identifier: &str, _config: &Config) -> Option<Arc<dyn PendingShareStore>> {
    None
}
