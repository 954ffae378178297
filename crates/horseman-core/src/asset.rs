//! Rider illustration asset, decoded once off the render path.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("failed to decode asset: {0}")]
    Decode(#[from] image::ImageError),
}

/// Handle to the rider illustration. Cheap to clone; empty until decoded.
#[derive(Debug, Clone, Default)]
pub struct RiderAsset {
    image: Arc<OnceLock<RgbaImage>>,
}

impl RiderAsset {
    /// An asset that has not finished loading.
    pub fn pending() -> Self {
        Self::default()
    }

    /// An asset that is already decoded.
    pub fn ready(image: RgbaImage) -> Self {
        let asset = Self::default();
        let _ = asset.image.set(image);
        asset
    }

    /// Decode `path` on a background thread. The handle stays pending until
    /// decoding finishes, and forever if it fails.
    pub fn load_in_background(path: PathBuf) -> Self {
        let asset = Self::pending();
        let slot = Arc::clone(&asset.image);
        let spawned = std::thread::Builder::new()
            .name("horseman-asset".into())
            .spawn(move || match load_rgba(&path) {
                Ok(image) => {
                    tracing::info!(
                        path = %path.display(),
                        width = image.width(),
                        height = image.height(),
                        "rider asset loaded"
                    );
                    let _ = slot.set(image);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "rider asset unavailable");
                }
            });
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "failed to spawn asset loader");
        }
        asset
    }

    /// The decoded image, or `None` while still loading.
    pub fn get(&self) -> Option<&RgbaImage> {
        self.image.get()
    }

    pub fn is_ready(&self) -> bool {
        self.image.get().is_some()
    }
}

/// Decode an image file into RGBA.
pub fn load_rgba(path: &Path) -> Result<RgbaImage, AssetError> {
    if !path.exists() {
        return Err(AssetError::NotFound(path.display().to_string()));
    }
    Ok(image::open(path)?.to_rgba8())
}
