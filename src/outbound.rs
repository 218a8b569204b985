use std::path::{Path, PathBuf};

use crate::models::{ShareFileOptions, ShareTextOptions};
use crate::{Error, Result};

/// What to put on the share sheet.
#[derive(Debug, Clone)]
pub enum ShareRequest {
    Text {
        text: String,
        options: ShareTextOptions,
    },
    File {
        path: PathBuf,
        options: ShareFileOptions,
    },
}

/// How the user left the share sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Completed,
    Cancelled,
}

/// A native share surface.
pub trait ShareSheet {
    /// Shows the sheet and blocks until the user is done with it.
    fn present(&self, request: ShareRequest) -> Result<ShareOutcome>;
}

pub fn share_text<S: ShareSheet>(sheet: &S, text: String, options: ShareTextOptions) -> Result<()> {
    finish(sheet.present(ShareRequest::Text { text, options })?)
}

/// Shares the local file behind `url` (a `file:` URL or a plain path).
///
/// The file is checked before any native UI is created.
pub fn share_file<S: ShareSheet>(sheet: &S, url: &str, options: ShareFileOptions) -> Result<()> {
    let path = resolve_local_file(url)?;
    finish(sheet.present(ShareRequest::File { path, options })?)
}

fn finish(outcome: ShareOutcome) -> Result<()> {
    match outcome {
        ShareOutcome::Completed => Ok(()),
        ShareOutcome::Cancelled => Err(Error::Cancelled),
    }
}

/// Turns the `url` argument of `shareFile` into an existing file path.
pub fn resolve_local_file(url: &str) -> Result<PathBuf> {
    let path = if url.starts_with("file:") {
        url::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.to_file_path().ok())
            .ok_or_else(|| Error::InvalidArgs(format!("Not a local file URL: {url}")))?
    } else {
        PathBuf::from(url)
    };
    if !path.is_file() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

/// The `file:` URL handed to native share sheets that expect URLs.
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path)
        .map(String::from)
        .unwrap_or_else(|()| path.display().to_string())
}
