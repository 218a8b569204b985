use std::path::PathBuf;

use image::DynamicImage;
use url::Url;

use crate::Result;

/// Type identifiers an attachment can conform to.
///
/// Overlapping conformance is normal: an image attachment usually also
/// satisfies `Url` and `Data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Image,
    Url,
    Text,
    Data,
}

/// What an attachment produced when loaded as a given type.
#[derive(Debug)]
pub enum LoadedItem {
    /// A file on disk. It may live somewhere only the receiving process can read.
    FileUrl(PathBuf),
    Url(Url),
    Text(String),
    /// An in-memory bitmap.
    Bitmap(DynamicImage),
    Bytes(Vec<u8>),
}

/// One item handed over by the share surface.
pub trait Attachment: Send + Sync {
    fn conforms_to(&self, ty: UniformType) -> bool;

    fn load(&self, ty: UniformType) -> Result<LoadedItem>;

    /// Display name reported by the sender, if any.
    fn suggested_name(&self) -> Option<String> {
        None
    }

    /// MIME type reported by the sender, if any.
    fn mime_type(&self) -> Option<String> {
        None
    }
}

/// A group of attachments, as delivered by the share request.
#[derive(Default)]
pub struct ExtensionItem {
    pub attachments: Vec<Box<dyn Attachment>>,
}

impl ExtensionItem {
    pub fn new(attachments: Vec<Box<dyn Attachment>>) -> Self {
        Self { attachments }
    }
}

/// A local file, e.g. a path passed on the command line or a copied content URI.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub path: PathBuf,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
}

impl FileAttachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            display_name: None,
            mime_type: None,
        }
    }

    fn effective_mime(&self) -> Option<String> {
        self.mime_type.clone().or_else(|| {
            mime_guess::from_path(&self.path)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
    }
}

impl Attachment for FileAttachment {
    fn conforms_to(&self, ty: UniformType) -> bool {
        match ty {
            UniformType::Image => self
                .effective_mime()
                .is_some_and(|mime| mime.starts_with("image/")),
            UniformType::Url | UniformType::Data => true,
            UniformType::Text => false,
        }
    }

    fn load(&self, _ty: UniformType) -> Result<LoadedItem> {
        Ok(LoadedItem::FileUrl(self.path.clone()))
    }

    fn suggested_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    fn mime_type(&self) -> Option<String> {
        self.effective_mime()
    }
}

/// Plain text.
#[derive(Debug, Clone)]
pub struct TextAttachment(pub String);

impl Attachment for TextAttachment {
    fn conforms_to(&self, ty: UniformType) -> bool {
        ty == UniformType::Text
    }

    fn load(&self, _ty: UniformType) -> Result<LoadedItem> {
        Ok(LoadedItem::Text(self.0.clone()))
    }
}

/// A URL, local (`file:`) or remote.
#[derive(Debug, Clone)]
pub struct UrlAttachment(pub Url);

impl Attachment for UrlAttachment {
    fn conforms_to(&self, ty: UniformType) -> bool {
        matches!(ty, UniformType::Url | UniformType::Text)
    }

    fn load(&self, ty: UniformType) -> Result<LoadedItem> {
        Ok(match ty {
            UniformType::Text => LoadedItem::Text(self.0.to_string()),
            _ => LoadedItem::Url(self.0.clone()),
        })
    }
}
