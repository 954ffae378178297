//! Per-frame compositor.
//!
//! Draw order is fixed: live frame, optional head mask, rider illustration,
//! captured head. The mask must precede the illustration so only the live
//! frame is erased, and the head is drawn last so nothing covers it.

use crate::asset::RiderAsset;
use crate::capture::HeadCutout;
use crate::geometry::{face_ellipse, CoverFit, Rect, Size, MASK_ELLIPSE};
use crate::raster;
use crate::types::LandmarkSet;
use image::{RgbImage, RgbaImage};

/// Where the rider's hand sits, as fractions of canvas width and height.
pub const HAND_ANCHOR: (f32, f32) = (0.63, 0.48);

/// User-adjustable placement of the captured head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Size of the head relative to its captured size, in percent.
    pub scale_percent: i32,
    /// Horizontal offset from the hand anchor, in canvas pixels.
    pub offset_x: i32,
    /// Vertical offset from the hand anchor, in canvas pixels.
    pub offset_y: i32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            scale_percent: 100,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

impl Placement {
    /// Anchor point the head is centered on.
    pub fn anchor(&self, canvas: Size) -> (f32, f32) {
        (
            canvas.width as f32 * HAND_ANCHOR.0 + self.offset_x as f32,
            canvas.height as f32 * HAND_ANCHOR.1 + self.offset_y as f32,
        )
    }

    /// Destination rectangle for a cutout of size `cutout` on `canvas`.
    ///
    /// Negative scales are treated as zero, which yields an empty rectangle.
    pub fn target_rect(&self, canvas: Size, cutout: Size) -> Rect {
        let scale = self.scale_percent.max(0) as f32 / 100.0;
        let (ax, ay) = self.anchor(canvas);
        Rect::centered(
            ax,
            ay,
            cutout.width as f32 * scale,
            cutout.height as f32 * scale,
        )
    }
}

/// Toggles and placement read for each rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub hide_head: bool,
    pub placement: Placement,
}

/// Owns the output canvas and composes each frame onto it.
pub struct Compositor {
    canvas: RgbaImage,
    rider: RiderAsset,
}

impl Compositor {
    pub fn new(rider: RiderAsset) -> Self {
        Self {
            canvas: RgbaImage::new(0, 0),
            rider,
        }
    }

    /// The most recently composed frame.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn size(&self) -> Size {
        Size::of(&self.canvas)
    }

    /// Blank the canvas, keeping its size.
    pub fn clear(&mut self) {
        raster::clear(&mut self.canvas);
    }

    /// Compose one frame onto a canvas of `display` size.
    pub fn render(
        &mut self,
        display: Size,
        frame: &RgbImage,
        landmarks: Option<&LandmarkSet>,
        cutout: Option<&HeadCutout>,
        options: &RenderOptions,
    ) {
        if self.size() != display {
            self.canvas = RgbaImage::new(display.width, display.height);
        }
        raster::clear(&mut self.canvas);

        let Some(fit) = CoverFit::compute(Size::of(frame), display) else {
            return;
        };
        raster::draw_image(&mut self.canvas, frame, fit.rect());

        if options.hide_head {
            if let Some(anchors) = landmarks.and_then(LandmarkSet::anchors) {
                let ellipse = face_ellipse(&anchors, &fit, &MASK_ELLIPSE);
                raster::erase_ellipse(&mut self.canvas, &ellipse);
            }
        }

        if let Some(rider) = self.rider.get() {
            let full = Rect::new(0.0, 0.0, display.width as f32, display.height as f32);
            raster::draw_image(&mut self.canvas, rider, full);
        }

        if let Some(cutout) = cutout {
            let rect = options.placement.target_rect(display, cutout.size());
            raster::draw_image(&mut self.canvas, cutout.image(), rect);
        }
    }
}
