//! Photo export: encode the composed canvas and share or download it.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PHOTO_FILE_NAME: &str = "headless_horseman.png";
pub const PHOTO_MIME: &str = "image/png";
pub const SHARE_TITLE: &str = "Headless Horseman";
pub const SHARE_TEXT: &str = "Spooky snapshot";

/// Shown after a download, for platforms that need a manual save.
pub const SAVED_HINT: &str = "Photo saved/downloaded. On iOS, long-press to Save Image if prompted.";
/// The only message shown when export fails.
pub const SAVE_FAILED: &str = "Could not save photo. Please try again.";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("nothing to export: canvas is empty")]
    EmptyCanvas,
    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("share failed: {0}")]
    Share(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An encoded photo ready to hand to the platform.
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Native sharing facility.
pub trait ShareTarget {
    /// Whether this target accepts the given file.
    fn can_share(&self, file: &PhotoFile) -> bool;
    fn share(&self, file: &PhotoFile, title: &str, text: &str) -> Result<(), ExportError>;
}

/// Fallback that stores the file locally.
pub trait DownloadTarget {
    fn download(&self, file: &PhotoFile) -> Result<PathBuf, ExportError>;
}

/// Saves downloads into a directory, writing through a temporary file
/// that is renamed into place.
#[derive(Debug, Clone)]
pub struct DirectoryDownload {
    dir: PathBuf,
}

impl DirectoryDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadTarget for DirectoryDownload {
    fn download(&self, file: &PhotoFile) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(&file.name);
        let partial = self.dir.join(format!(".{}.part", file.name));

        std::fs::write(&partial, &file.bytes)?;
        if let Err(e) = std::fs::rename(&partial, &target) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }
        Ok(target)
    }
}

/// How a photo left the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Shared,
    Downloaded { path: PathBuf },
}

impl ExportOutcome {
    /// Text to show the user, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ExportOutcome::Shared => None,
            ExportOutcome::Downloaded { .. } => Some(SAVED_HINT),
        }
    }
}

/// Encode the canvas as `headless_horseman.png`.
pub fn encode_png(canvas: &RgbaImage) -> Result<PhotoFile, ExportError> {
    if canvas.width() == 0 || canvas.height() == 0 {
        return Err(ExportError::EmptyCanvas);
    }
    let mut bytes = Vec::new();
    canvas.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(PhotoFile {
        name: PHOTO_FILE_NAME.to_string(),
        mime: PHOTO_MIME.to_string(),
        bytes,
    })
}

/// Export the already-composed canvas: share when possible, otherwise download.
pub fn export_photo(
    canvas: &RgbaImage,
    share: Option<&dyn ShareTarget>,
    download: &dyn DownloadTarget,
) -> Result<ExportOutcome, ExportError> {
    let file = encode_png(canvas)?;

    if let Some(target) = share.filter(|t| t.can_share(&file)) {
        target.share(&file, SHARE_TITLE, SHARE_TEXT)?;
        tracing::info!(name = %file.name, bytes = file.bytes.len(), "photo shared");
        return Ok(ExportOutcome::Shared);
    }

    let path = download.download(&file)?;
    tracing::info!(path = %path.display(), bytes = file.bytes.len(), "photo downloaded");
    Ok(ExportOutcome::Downloaded { path })
}
