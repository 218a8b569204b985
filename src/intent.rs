//! Shares delivered straight to the app process.
//!
//! Android hands `SEND`/`SEND_MULTIPLE` intents to the running activity, and a
//! desktop app registered as a share target is launched with the shared items
//! on its command line. Both are turned into attachments and resolved with the
//! same rules the receiver uses.

use std::path::Path;

use url::Url;

use crate::models::SharedContent;
use crate::receiver::{
    self, Attachment, ExtensionContext, ExtensionItem, FileAttachment, SharedFilesDir,
    TextAttachment, UrlAttachment,
};

/// Marks a launch as a share-target activation; the shared items follow it.
pub const SHARE_TARGET_FLAG: &str = "--share-target";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareAction {
    Send,
    SendMultiple,
}

/// An incoming share intent.
#[derive(Debug, Clone)]
pub struct ShareIntent {
    pub action: ShareAction,
    pub mime_type: Option<String>,
    pub text: Option<String>,
    pub streams: Vec<FileAttachment>,
}

impl ShareIntent {
    /// Attachments carried by the intent.
    pub fn into_items(self) -> Vec<ExtensionItem> {
        let attachments: Vec<Box<dyn Attachment>> = match self.action {
            ShareAction::Send => {
                let is_text = self
                    .mime_type
                    .as_deref()
                    .is_some_and(|mime| mime.starts_with("text/"));
                if is_text {
                    self.text
                        .map(|text| Box::new(TextAttachment(text)) as Box<dyn Attachment>)
                        .into_iter()
                        .collect()
                } else {
                    self.streams
                        .into_iter()
                        .take(1)
                        .map(|stream| Box::new(stream) as Box<dyn Attachment>)
                        .collect()
                }
            }
            ShareAction::SendMultiple => self
                .streams
                .into_iter()
                .map(|stream| Box::new(stream) as Box<dyn Attachment>)
                .collect(),
        };
        if attachments.is_empty() {
            Vec::new()
        } else {
            vec![ExtensionItem::new(attachments)]
        }
    }

    /// Extracts the intent into `files`, or `None` if nothing usable was shared.
    pub fn extract(self, files: &SharedFilesDir) -> Option<SharedContent> {
        receiver::extract(&self.into_items(), files)
    }
}

/// Items following [`SHARE_TARGET_FLAG`], or `None` when the flag is absent.
pub fn activation_items<I, S>(args: I) -> Option<Vec<ExtensionItem>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();
    args.by_ref()
        .find(|arg| AsRef::<str>::as_ref(arg) == SHARE_TARGET_FLAG)?;
    let attachments: Vec<Box<dyn Attachment>> = args.map(|arg| classify(arg.as_ref())).collect();
    Some(vec![ExtensionItem::new(attachments)])
}

fn classify(arg: &str) -> Box<dyn Attachment> {
    let path = Path::new(arg);
    if path.is_file() {
        return Box::new(FileAttachment::new(path));
    }
    if !arg.chars().any(char::is_whitespace) {
        if let Ok(url) = Url::parse(arg) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Box::new(FileAttachment::new(path));
                }
            } else if url.scheme().len() > 1 {
                // Single-letter schemes are Windows drive letters.
                return Box::new(UrlAttachment(url));
            }
        }
    }
    Box::new(TextAttachment(arg.to_string()))
}

/// Receiver context for a desktop share-target launch. There is no UI, so
/// errors are only logged.
pub struct ActivationContext {
    items: Vec<ExtensionItem>,
}

impl ActivationContext {
    pub fn new(items: Vec<ExtensionItem>) -> Self {
        Self { items }
    }
}

impl ExtensionContext for ActivationContext {
    fn input_items(&self) -> &[ExtensionItem] {
        &self.items
    }

    fn open_url(&self, url: &Url) {
        if let Err(e) = crate::platform::launch_url(url) {
            log::warn!("could not wake the running app via {url}: {e}");
        }
    }

    fn complete_request(&self) {
        log::debug!("share-target activation finished");
    }
}
