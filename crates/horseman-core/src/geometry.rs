//! Cover-fit placement, normalized-to-canvas mapping and head ellipses.

use crate::types::FaceAnchors;

/// Pixel dimensions of a frame, canvas or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn of<I: image::GenericImageView>(img: &I) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height)
    }
}

/// Axis-aligned rectangle in destination pixel units. May extend past the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered on `(cx, cy)`.
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Placement that scales a source to fully cover a destination, centering the overflow.
///
/// Equivalent to CSS `background-size: cover`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub render_width: f32,
    pub render_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl CoverFit {
    /// Compute the fit of `source` into `dest`.
    ///
    /// Returns `None` if either size has a zero dimension (e.g. the camera
    /// has not produced a frame yet); callers skip the frame.
    pub fn compute(source: Size, dest: Size) -> Option<Self> {
        if source.is_empty() || dest.is_empty() {
            return None;
        }
        let (sw, sh) = (source.width as f32, source.height as f32);
        let (dw, dh) = (dest.width as f32, dest.height as f32);
        let source_aspect = sw / sh;
        let dest_aspect = dw / dh;

        let fit = if source_aspect > dest_aspect {
            let render_width = dh * source_aspect;
            Self {
                render_width,
                render_height: dh,
                offset_x: (dw - render_width) / 2.0,
                offset_y: 0.0,
            }
        } else {
            let render_height = dw / source_aspect;
            Self {
                render_width: dw,
                render_height,
                offset_x: 0.0,
                offset_y: (dh - render_height) / 2.0,
            }
        };
        Some(fit)
    }

    /// Map a normalized `[0,1]` coordinate to destination pixels.
    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.render_width + self.offset_x,
            y * self.render_height + self.offset_y,
        )
    }

    /// Where the whole source lands in destination pixels.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.offset_x,
            self.offset_y,
            self.render_width,
            self.render_height,
        )
    }
}

/// Axis-aligned ellipse in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
}

impl Ellipse {
    /// Whether the point lies inside (or on) the ellipse. Degenerate ellipses contain nothing.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        if self.rx <= 0.0 || self.ry <= 0.0 {
            return false;
        }
        let dx = (x - self.cx) / self.rx;
        let dy = (y - self.cy) / self.ry;
        dx * dx + dy * dy <= 1.0
    }

    /// Integer pixel bounds `(x0, y0, x1, y1)` clamped to `size`, end-exclusive.
    pub fn pixel_bounds(&self, size: Size) -> (u32, u32, u32, u32) {
        let clamp_x = |v: f32| v.clamp(0.0, size.width as f32) as u32;
        let clamp_y = |v: f32| v.clamp(0.0, size.height as f32) as u32;
        (
            clamp_x((self.cx - self.rx).floor()),
            clamp_y((self.cy - self.ry).floor()),
            clamp_x((self.cx + self.rx).ceil()),
            clamp_y((self.cy + self.ry).ceil()),
        )
    }
}

/// Shape constants for a head ellipse, relative to the face measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseParams {
    /// Upward shift of the center, as a fraction of inter-temple distance.
    pub lift: f32,
    /// Horizontal radius as a fraction of inter-temple distance.
    pub radius_x: f32,
    /// Vertical radius as a fraction of the forehead-to-chin height.
    pub radius_y: f32,
}

/// Ellipse erased from the live frame when the head is hidden.
pub const MASK_ELLIPSE: EllipseParams = EllipseParams {
    lift: 0.05,
    radius_x: 0.55,
    radius_y: 0.65,
};

/// Ellipse kept when capturing the head. Slightly larger than [`MASK_ELLIPSE`].
pub const CAPTURE_ELLIPSE: EllipseParams = EllipseParams {
    lift: 0.02,
    radius_x: 0.58,
    radius_y: 0.72,
};

/// Head ellipse in canvas pixels for the given anchors under `fit`.
pub fn face_ellipse(anchors: &FaceAnchors, fit: &CoverFit, params: &EllipseParams) -> Ellipse {
    let (fx, fy) = fit.map(anchors.forehead.x, anchors.forehead.y);
    let (chx, chy) = fit.map(anchors.chin.x, anchors.chin.y);
    let (lx, ly) = fit.map(anchors.left_temple.x, anchors.left_temple.y);
    let (rx, ry) = fit.map(anchors.right_temple.x, anchors.right_temple.y);

    let face_width = (rx - lx).hypot(ry - ly);
    Ellipse {
        cx: (fx + chx) / 2.0,
        cy: (fy + chy) / 2.0 - face_width * params.lift,
        rx: face_width * params.radius_x,
        ry: (chy - fy).abs() * params.radius_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::face_set;

    const EPS: f32 = 1e-3;

    #[test]
    fn test_cover_fit_wide_video() {
        let fit = CoverFit::compute(Size::new(1280, 720), Size::new(800, 600)).unwrap();
        assert!((fit.render_height - 600.0).abs() < EPS);
        assert!((fit.render_width - 1066.667).abs() < EPS);
        assert!((fit.offset_x + 133.333).abs() < EPS);
        assert_eq!(fit.offset_y, 0.0);
    }

    #[test]
    fn test_cover_fit_tall_video() {
        let fit = CoverFit::compute(Size::new(720, 1280), Size::new(800, 600)).unwrap();
        assert_eq!(fit.render_width, 800.0);
        assert!((fit.render_height - 1422.222).abs() < EPS);
        assert_eq!(fit.offset_x, 0.0);
        assert!((fit.offset_y + 411.111).abs() < EPS);
    }

    #[test]
    fn test_cover_fit_zero_dimensions() {
        assert!(CoverFit::compute(Size::new(0, 720), Size::new(800, 600)).is_none());
        assert!(CoverFit::compute(Size::new(1280, 0), Size::new(800, 600)).is_none());
        assert!(CoverFit::compute(Size::new(1280, 720), Size::new(0, 600)).is_none());
    }

    #[test]
    fn test_cover_fit_always_covers_and_centers() {
        let sizes = [
            (1, 1),
            (640, 360),
            (1280, 720),
            (720, 1280),
            (800, 600),
            (333, 777),
            (1920, 1080),
            (100, 1000),
        ];
        for &(sw, sh) in &sizes {
            for &(dw, dh) in &sizes {
                let fit = CoverFit::compute(Size::new(sw, sh), Size::new(dw, dh)).unwrap();
                let (dw, dh) = (dw as f32, dh as f32);
                let tol = 1e-3 * dw.max(dh);
                assert!(fit.render_width >= dw - tol, "{sw}x{sh} -> {dw}x{dh}");
                assert!(fit.render_height >= dh - tol, "{sw}x{sh} -> {dw}x{dh}");

                let w_exact = (fit.render_width - dw).abs() <= tol;
                let h_exact = (fit.render_height - dh).abs() <= tol;
                assert!(w_exact || h_exact, "one axis must match exactly");

                assert!((fit.offset_x - (dw - fit.render_width) / 2.0).abs() <= tol);
                assert!((fit.offset_y - (dh - fit.render_height) / 2.0).abs() <= tol);
                if w_exact && !h_exact {
                    assert_eq!(fit.offset_x, 0.0);
                }
                if h_exact && !w_exact {
                    assert_eq!(fit.offset_y, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_map_corners() {
        let fit = CoverFit::compute(Size::new(1280, 720), Size::new(800, 600)).unwrap();
        assert_eq!(fit.map(0.0, 0.0), (fit.offset_x, fit.offset_y));
        let (x, y) = fit.map(1.0, 1.0);
        assert!((x - (fit.offset_x + fit.render_width)).abs() < EPS);
        assert!((y - (fit.offset_y + fit.render_height)).abs() < EPS);
    }

    #[test]
    fn test_map_is_order_preserving() {
        let fit = CoverFit::compute(Size::new(640, 480), Size::new(300, 500)).unwrap();
        let mut prev = fit.map(0.0, 0.0);
        for i in 1..=10 {
            let t = i as f32 / 10.0;
            let cur = fit.map(t, t);
            assert!(cur.0 > prev.0 && cur.1 > prev.1);
            prev = cur;
        }
    }

    #[test]
    fn test_forehead_chin_mapping_example() {
        let fit = CoverFit::compute(Size::new(1280, 720), Size::new(800, 600)).unwrap();
        let (fx, fy) = fit.map(0.5, 0.2);
        let (cx, cy) = fit.map(0.5, 0.6);
        assert!((fx - 400.0).abs() < EPS && (fy - 120.0).abs() < EPS);
        assert!((cx - 400.0).abs() < EPS && (cy - 360.0).abs() < EPS);
    }

    #[test]
    fn test_mask_ellipse_example() {
        let fit = CoverFit::compute(Size::new(1280, 720), Size::new(800, 600)).unwrap();
        // Temples map to x = 336 and x = 464, so face width is 128 px.
        let set = face_set((0.5, 0.2), (0.5, 0.6), (0.44, 0.4), (0.56, 0.4));
        let e = face_ellipse(&set.anchors().unwrap(), &fit, &MASK_ELLIPSE);
        assert!((e.cx - 400.0).abs() < EPS);
        assert!((e.cy - (240.0 - 128.0 * 0.05)).abs() < EPS);
        assert!((e.cy - 234.0).abs() < 0.5);
        assert!((e.rx - 128.0 * 0.55).abs() < EPS);
        assert!((e.ry - 240.0 * 0.65).abs() < EPS);
    }

    #[test]
    fn test_ellipse_constant_pair() {
        // The two ellipses differ on purpose; pin both.
        assert_eq!(
            (MASK_ELLIPSE.lift, MASK_ELLIPSE.radius_x, MASK_ELLIPSE.radius_y),
            (0.05, 0.55, 0.65)
        );
        assert_eq!(
            (CAPTURE_ELLIPSE.lift, CAPTURE_ELLIPSE.radius_x, CAPTURE_ELLIPSE.radius_y),
            (0.02, 0.58, 0.72)
        );
        assert!(CAPTURE_ELLIPSE.radius_x > MASK_ELLIPSE.radius_x);
        assert!(CAPTURE_ELLIPSE.radius_y > MASK_ELLIPSE.radius_y);
    }

    #[test]
    fn test_ellipse_centered_on_forehead_chin_midpoint() {
        let fit = CoverFit::compute(Size::new(1000, 1000), Size::new(1000, 1000)).unwrap();
        let set = face_set((0.42, 0.3), (0.46, 0.7), (0.3, 0.5), (0.6, 0.5));
        let anchors = set.anchors().unwrap();
        for params in [MASK_ELLIPSE, CAPTURE_ELLIPSE] {
            let e = face_ellipse(&anchors, &fit, &params);
            assert!((e.cx - 440.0).abs() < EPS);
            assert!((e.cy - (500.0 - 300.0 * params.lift)).abs() < EPS);
        }
    }

    #[test]
    fn test_radii_scale_with_face_size() {
        let fit = CoverFit::compute(Size::new(1000, 1000), Size::new(1000, 1000)).unwrap();
        let small = face_set((0.5, 0.45), (0.5, 0.55), (0.45, 0.5), (0.55, 0.5));
        let large = face_set((0.5, 0.4), (0.5, 0.6), (0.4, 0.5), (0.6, 0.5));
        for params in [MASK_ELLIPSE, CAPTURE_ELLIPSE] {
            let a = face_ellipse(&small.anchors().unwrap(), &fit, &params);
            let b = face_ellipse(&large.anchors().unwrap(), &fit, &params);
            assert!((b.rx - 2.0 * a.rx).abs() < EPS);
            assert!((b.ry - 2.0 * a.ry).abs() < EPS);
        }
    }

    #[test]
    fn test_inverted_face_keeps_positive_radius() {
        let fit = CoverFit::compute(Size::new(100, 100), Size::new(100, 100)).unwrap();
        let set = face_set((0.5, 0.7), (0.5, 0.3), (0.4, 0.5), (0.6, 0.5));
        let e = face_ellipse(&set.anchors().unwrap(), &fit, &MASK_ELLIPSE);
        assert!(e.ry > 0.0);
    }

    #[test]
    fn test_ellipse_contains() {
        let e = Ellipse {
            cx: 10.0,
            cy: 10.0,
            rx: 5.0,
            ry: 2.0,
        };
        assert!(e.contains(10.0, 10.0));
        assert!(e.contains(14.9, 10.0));
        assert!(!e.contains(10.0, 12.5));
        let flat = Ellipse {
            cx: 0.0,
            cy: 0.0,
            rx: 0.0,
            ry: 1.0,
        };
        assert!(!flat.contains(0.0, 0.0));
    }

    #[test]
    fn test_pixel_bounds_clamped() {
        let e = Ellipse {
            cx: 2.0,
            cy: 8.0,
            rx: 4.0,
            ry: 4.0,
        };
        assert_eq!(e.pixel_bounds(Size::new(10, 10)), (0, 4, 6, 10));
    }
}
