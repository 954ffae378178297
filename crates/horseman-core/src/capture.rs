//! Head capture: elliptical cutout of the current frame around the face.

use crate::geometry::{face_ellipse, CoverFit, Size, CAPTURE_ELLIPSE};
use crate::raster;
use crate::types::LandmarkSet;
use image::{RgbImage, RgbaImage};
use std::sync::Arc;

/// Options applied when a head is captured.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// Trim the cutout to the ellipse bounding box instead of keeping the
    /// full canvas-sized buffer.
    pub crop_to_ellipse: bool,
}

/// Captured head raster: opaque inside the capture ellipse, transparent elsewhere.
///
/// Immutable once built; placement and scaling happen at draw time.
#[derive(Debug)]
pub struct HeadCutout {
    image: RgbaImage,
}

impl HeadCutout {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn size(&self) -> Size {
        Size::of(&self.image)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(image: RgbaImage) -> Self {
        Self { image }
    }
}

/// Cut the head out of `frame` as it appears on a canvas of `canvas` size.
///
/// Returns `None` when the landmarks lack the face anchors or the frame or
/// canvas has a zero dimension.
pub fn capture_head(
    frame: &RgbImage,
    canvas: Size,
    landmarks: &LandmarkSet,
    options: CaptureOptions,
) -> Option<HeadCutout> {
    let anchors = landmarks.anchors()?;
    let fit = CoverFit::compute(Size::of(frame), canvas)?;

    let mut buffer = RgbaImage::new(canvas.width, canvas.height);
    raster::draw_image(&mut buffer, frame, fit.rect());

    let ellipse = face_ellipse(&anchors, &fit, &CAPTURE_ELLIPSE);
    let mask = raster::ellipse_hole_mask(canvas, &ellipse);
    raster::keep_unmasked(&mut buffer, &mask);

    let image = if options.crop_to_ellipse {
        let (x0, y0, x1, y1) = ellipse.pixel_bounds(canvas);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        image::imageops::crop_imm(&buffer, x0, y0, x1 - x0, y1 - y0).to_image()
    } else {
        buffer
    };

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        cx = ellipse.cx,
        cy = ellipse.cy,
        "head captured"
    );
    Some(HeadCutout { image })
}

/// Single-slot cutout cache. Each capture replaces the previous cutout.
#[derive(Debug, Default, Clone)]
pub struct CutoutCache {
    slot: Option<Arc<HeadCutout>>,
}

impl CutoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Arc<HeadCutout>> {
        self.slot.as_ref()
    }

    pub fn replace(&mut self, cutout: HeadCutout) -> Option<Arc<HeadCutout>> {
        self.slot.replace(Arc::new(cutout))
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Capture from `frame` and store the result. Leaves the cache untouched
    /// when nothing could be captured; returns whether a new cutout was stored.
    pub fn capture(
        &mut self,
        frame: &RgbImage,
        canvas: Size,
        landmarks: Option<&LandmarkSet>,
        options: CaptureOptions,
    ) -> bool {
        let Some(landmarks) = landmarks else {
            return false;
        };
        match capture_head(frame, canvas, landmarks, options) {
            Some(cutout) => {
                self.replace(cutout);
                true
            }
            None => false,
        }
    }
}
