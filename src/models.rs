use serde::{Deserialize, Serialize};

/// Edge of the anchor rectangle the share picker appears from (macOS and iPad).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredEdge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Where the share sheet is anchored, in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePosition {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_edge: Option<PreferredEdge>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareTextOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SharePosition>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareFileOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SharePosition>,
}

/// Arguments forwarded to the native `shareText` command on mobile.
#[derive(Debug, Serialize)]
pub struct ShareTextPayload {
    pub text: String,
    #[serde(flatten)]
    pub options: ShareTextOptions,
}

/// Arguments forwarded to the native `shareFile` command on mobile.
#[derive(Debug, Serialize)]
pub struct ShareFilePayload {
    pub url: String,
    #[serde(flatten)]
    pub options: ShareFileOptions,
}

/// A file received from another app, copied into the plugin's shared files directory.
///
/// `path` always points at the private copy, never at the sender's original location,
/// so it stays readable after the process that received the share has exited.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Byte length of the copy.
    #[serde(default)]
    pub size: u64,
}

/// Content shared into the app: either text or a non-empty list of files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SharedContent {
    Text { text: String },
    Files { files: Vec<SharedFile> },
}

impl SharedContent {
    pub fn text(text: impl Into<String>) -> Self {
        SharedContent::Text { text: text.into() }
    }

    /// Builds a files payload, or `None` when nothing was materialized.
    pub fn files(files: Vec<SharedFile>) -> Option<Self> {
        if files.is_empty() {
            None
        } else {
            Some(SharedContent::Files { files })
        }
    }

    /// A decoded record can still carry an empty file list; such a record means "no share".
    pub(crate) fn is_deliverable(&self) -> bool {
        match self {
            SharedContent::Text { .. } => true,
            SharedContent::Files { files } => !files.is_empty(),
        }
    }
}
