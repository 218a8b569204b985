use std::path::Path;

use url::Url;

use super::attachment::{Attachment, LoadedItem, UniformType};
use super::materialize::SharedFilesDir;
use crate::models::SharedFile;
use crate::{Error, Result};

/// What a single attachment contributed to the share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Extracted {
    File(SharedFile),
    Text(String),
}

type Extractor = fn(LoadedItem, &dyn Attachment, &SharedFilesDir) -> Result<Option<Extracted>>;

/// Checked top to bottom; the first type an attachment conforms to decides how it is read.
///
/// Image must come before Url: image attachments typically conform to both, and
/// reading them as a URL would lose the image handling.
const RESOLUTION_ORDER: [(UniformType, Extractor); 4] = [
    (UniformType::Image, extract_image),
    (UniformType::Url, extract_url),
    (UniformType::Text, extract_text),
    (UniformType::Data, extract_data),
];

/// Loads `attachment` as its highest-priority type and materializes the result.
pub(crate) fn resolve(
    attachment: &dyn Attachment,
    files: &SharedFilesDir,
) -> Result<Option<Extracted>> {
    let Some((ty, extractor)) = RESOLUTION_ORDER
        .iter()
        .find(|(ty, _)| attachment.conforms_to(*ty))
    else {
        return Ok(None);
    };
    let item = attachment.load(*ty)?;
    extractor(item, attachment, files)
}

fn copy(
    path: &Path,
    attachment: &dyn Attachment,
    files: &SharedFilesDir,
) -> Result<Option<Extracted>> {
    let name = attachment.suggested_name();
    let mime = attachment.mime_type();
    files
        .copy_file(path, name.as_deref(), mime.as_deref())
        .map(|file| Some(Extracted::File(file)))
}

fn file_url_path(url: &Url) -> Result<std::path::PathBuf> {
    url.to_file_path()
        .map_err(|_| Error::InvalidArgs(format!("not a local file URL: {url}")))
}

fn extract_image(
    item: LoadedItem,
    attachment: &dyn Attachment,
    files: &SharedFilesDir,
) -> Result<Option<Extracted>> {
    match item {
        LoadedItem::FileUrl(path) => copy(&path, attachment, files),
        LoadedItem::Url(url) if url.scheme() == "file" => {
            copy(&file_url_path(&url)?, attachment, files)
        }
        LoadedItem::Bitmap(image) => files.write_png(&image).map(|f| Some(Extracted::File(f))),
        LoadedItem::Bytes(bytes) => {
            let image = image::load_from_memory(&bytes)?;
            files.write_png(&image).map(|f| Some(Extracted::File(f)))
        }
        LoadedItem::Url(_) | LoadedItem::Text(_) => Ok(None),
    }
}

fn extract_url(
    item: LoadedItem,
    attachment: &dyn Attachment,
    files: &SharedFilesDir,
) -> Result<Option<Extracted>> {
    match item {
        LoadedItem::FileUrl(path) => copy(&path, attachment, files),
        LoadedItem::Url(url) if url.scheme() == "file" => {
            copy(&file_url_path(&url)?, attachment, files)
        }
        LoadedItem::Url(url) => Ok(Some(Extracted::Text(url.to_string()))),
        LoadedItem::Text(text) => Ok(Some(Extracted::Text(text))),
        LoadedItem::Bitmap(_) | LoadedItem::Bytes(_) => Ok(None),
    }
}

fn extract_text(
    item: LoadedItem,
    _attachment: &dyn Attachment,
    _files: &SharedFilesDir,
) -> Result<Option<Extracted>> {
    match item {
        LoadedItem::Text(text) => Ok(Some(Extracted::Text(text))),
        LoadedItem::Url(url) => Ok(Some(Extracted::Text(url.to_string()))),
        _ => Ok(None),
    }
}

fn extract_data(
    item: LoadedItem,
    attachment: &dyn Attachment,
    files: &SharedFilesDir,
) -> Result<Option<Extracted>> {
    match item {
        LoadedItem::FileUrl(path) => copy(&path, attachment, files),
        LoadedItem::Url(url) if url.scheme() == "file" => {
            copy(&file_url_path(&url)?, attachment, files)
        }
        LoadedItem::Bytes(bytes) => {
            let name = attachment.suggested_name();
            let mime = attachment.mime_type();
            files
                .write_bytes(&bytes, name.as_deref(), mime.as_deref())
                .map(|f| Some(Extracted::File(f)))
        }
        LoadedItem::Bitmap(image) => files.write_png(&image).map(|f| Some(Extracted::File(f))),
        LoadedItem::Url(_) | LoadedItem::Text(_) => Ok(None),
    }
}
