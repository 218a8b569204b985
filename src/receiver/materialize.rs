use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use uuid::Uuid;

use crate::models::SharedFile;
use crate::{Error, Result};

/// Writes durable copies of shared items into the shared files directory.
#[derive(Debug, Clone)]
pub struct SharedFilesDir {
    dir: PathBuf,
}

impl SharedFilesDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Copies `source` and describes the copy.
    pub fn copy_file(
        &self,
        source: &Path,
        display_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<SharedFile> {
        if !source.is_file() {
            return Err(Error::FileNotFound(source.display().to_string()));
        }
        let name = display_name
            .and_then(sanitize_name)
            .or_else(|| source.file_name().and_then(|n| n.to_str()).and_then(sanitize_name))
            .unwrap_or_else(|| generated_name(mime_type));
        let mime_type = mime_type.map(str::to_string).or_else(|| guess_mime(&name));

        let destination = self.unique_destination(&name)?;
        fs::copy(source, &destination)?;
        self.describe(destination, name, mime_type)
    }

    /// Encodes a bitmap as PNG under a generated name.
    pub fn write_png(&self, image: &DynamicImage) -> Result<SharedFile> {
        let mut encoded = Cursor::new(Vec::new());
        image.write_to(&mut encoded, ImageFormat::Png)?;

        let name = format!("{}.png", Uuid::new_v4());
        self.prepare()?;
        let destination = self.dir.join(&name);
        fs::write(&destination, encoded.into_inner())?;
        self.describe(destination, name, Some("image/png".to_string()))
    }

    /// Writes raw bytes under the suggested name.
    pub fn write_bytes(
        &self,
        bytes: &[u8],
        display_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<SharedFile> {
        let name = display_name
            .and_then(sanitize_name)
            .unwrap_or_else(|| generated_name(mime_type));
        let mime_type = mime_type.map(str::to_string).or_else(|| guess_mime(&name));

        let destination = self.unique_destination(&name)?;
        fs::write(&destination, bytes)?;
        self.describe(destination, name, mime_type)
    }

    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn unique_destination(&self, name: &str) -> Result<PathBuf> {
        self.prepare()?;
        Ok(self.dir.join(format!("{}_{}", Uuid::new_v4(), name)))
    }

    fn describe(
        &self,
        path: PathBuf,
        name: String,
        mime_type: Option<String>,
    ) -> Result<SharedFile> {
        let size = fs::metadata(&path)?.len();
        let path = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        Ok(SharedFile {
            path: path.to_string_lossy().into_owned(),
            name,
            mime_type,
            size,
        })
    }
}

/// Keeps only the final path component, so a sender cannot escape the shared directory.
fn sanitize_name(name: &str) -> Option<String> {
    let file_name = Path::new(name.trim()).file_name()?.to_str()?;
    if file_name.is_empty() || file_name == "." || file_name == ".." {
        return None;
    }
    Some(file_name.to_string())
}

fn generated_name(mime_type: Option<&str>) -> String {
    let extension = mime_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|extensions| extensions.first());
    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

fn guess_mime(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_with_unique_prefix_and_copy_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.pdf");
        fs::write(&source, b"%PDF-1.7 hello").unwrap();

        let files = SharedFilesDir::new(dir.path().join("shared_files"));
        let shared = files.copy_file(&source, None, None).unwrap();

        assert_eq!(shared.name, "report.pdf");
        assert_eq!(shared.size, 14);
        assert_eq!(shared.mime_type.as_deref(), Some("application/pdf"));
        let copy = PathBuf::from(&shared.path);
        assert!(copy.is_absolute());
        assert_ne!(copy, source);
        assert!(copy.file_name().unwrap().to_str().unwrap().ends_with("_report.pdf"));
        assert_eq!(fs::read(copy).unwrap(), b"%PDF-1.7 hello");
    }

    #[test]
    fn two_copies_of_same_name_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"x").unwrap();
        let files = SharedFilesDir::new(dir.path().join("out"));

        let first = files.copy_file(&source, None, None).unwrap();
        let second = files.copy_file(&source, None, None).unwrap();
        assert_ne!(first.path, second.path);
    }

    #[test]
    fn display_name_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.bin");
        fs::write(&source, b"1234").unwrap();
        let files = SharedFilesDir::new(dir.path().join("out"));

        let shared = files
            .copy_file(&source, Some("../../etc/passwd"), Some("text/plain"))
            .unwrap();
        assert_eq!(shared.name, "passwd");
        assert!(PathBuf::from(&shared.path).starts_with(files.path()));
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let files = SharedFilesDir::new(dir.path());
        let result = files.copy_file(&dir.path().join("missing"), None, None);
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn bitmap_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let files = SharedFilesDir::new(dir.path());
        let image = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));

        let shared = files.write_png(&image).unwrap();
        assert!(shared.name.ends_with(".png"));
        assert_eq!(shared.mime_type.as_deref(), Some("image/png"));
        let bytes = fs::read(&shared.path).unwrap();
        assert_eq!(bytes.len() as u64, shared.size);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn unnamed_bytes_get_extension_from_mime() {
        let dir = tempfile::tempdir().unwrap();
        let files = SharedFilesDir::new(dir.path());
        let shared = files.write_bytes(b"{}", None, Some("application/json")).unwrap();
        let ext = Path::new(&shared.name).extension().unwrap().to_str().unwrap();
        let known = mime_guess::get_mime_extensions_str("application/json").unwrap();
        assert!(known.contains(&ext));
        assert_eq!(shared.mime_type.as_deref(), Some("application/json"));
        assert_eq!(shared.size, 2);
    }
}
