//! Raster operations over straight-alpha RGBA buffers.
//!
//! Canvas composite modes are expressed as explicit per-pixel alpha arithmetic:
//! "erase a region" zeroes alpha inside an ellipse, and "keep only a region"
//! builds a hole mask and takes `min(alpha, 255 - mask)`.

use crate::geometry::{Ellipse, Rect, Size};
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgba, RgbaImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Clear every pixel to fully transparent.
pub fn clear(canvas: &mut RgbaImage) {
    for p in canvas.pixels_mut() {
        *p = TRANSPARENT;
    }
}

/// Source-over blend of one straight-alpha pixel onto another.
pub fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    if src[3] == 255 {
        *dst = src;
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Draw `src` scaled into `rect` (destination pixels) with source-over blending.
///
/// Uses nearest-neighbor sampling at pixel centers; parts of `rect` outside
/// the canvas are clipped. Empty sources or rectangles draw nothing.
pub fn draw_image<P>(dst: &mut RgbaImage, src: &ImageBuffer<P, Vec<u8>>, rect: Rect)
where
    P: Pixel<Subpixel = u8>,
{
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let (dw, dh) = dst.dimensions();
    let x0 = rect.x.floor().clamp(0.0, dw as f32) as u32;
    let y0 = rect.y.floor().clamp(0.0, dh as f32) as u32;
    let x1 = (rect.x + rect.width).ceil().clamp(0.0, dw as f32) as u32;
    let y1 = (rect.y + rect.height).ceil().clamp(0.0, dh as f32) as u32;

    let scale_x = sw as f32 / rect.width;
    let scale_y = sh as f32 / rect.height;

    for y in y0..y1 {
        let cy = y as f32 + 0.5 - rect.y;
        if cy < 0.0 || cy >= rect.height {
            continue;
        }
        let sy = ((cy * scale_y) as u32).min(sh - 1);
        for x in x0..x1 {
            let cx = x as f32 + 0.5 - rect.x;
            if cx < 0.0 || cx >= rect.width {
                continue;
            }
            let sx = ((cx * scale_x) as u32).min(sw - 1);
            let s = src.get_pixel(sx, sy).to_rgba();
            blend_over(dst.get_pixel_mut(x, y), s);
        }
    }
}

/// Make every pixel whose center lies inside `ellipse` fully transparent.
pub fn erase_ellipse(canvas: &mut RgbaImage, ellipse: &Ellipse) {
    let (x0, y0, x1, y1) = ellipse.pixel_bounds(Size::new(canvas.width(), canvas.height()));
    for y in y0..y1 {
        for x in x0..x1 {
            if ellipse.contains(x as f32 + 0.5, y as f32 + 0.5) {
                canvas.put_pixel(x, y, TRANSPARENT);
            }
        }
    }
}

/// An opaque mask of `size` with `ellipse` punched out (0 inside, 255 outside).
pub fn ellipse_hole_mask(size: Size, ellipse: &Ellipse) -> GrayImage {
    let mut mask = GrayImage::from_pixel(size.width, size.height, Luma([255]));
    let (x0, y0, x1, y1) = ellipse.pixel_bounds(size);
    for y in y0..y1 {
        for x in x0..x1 {
            if ellipse.contains(x as f32 + 0.5, y as f32 + 0.5) {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
    }
    mask
}

/// Keep only pixels where `mask` is not opaque: `alpha = min(alpha, 255 - mask)`.
///
/// Pixels outside the mask's extent are treated as fully masked.
pub fn keep_unmasked(canvas: &mut RgbaImage, mask: &GrayImage) {
    let (mw, mh) = mask.dimensions();
    for (x, y, p) in canvas.enumerate_pixels_mut() {
        let m = if x < mw && y < mh {
            mask.get_pixel(x, y)[0]
        } else {
            255
        };
        let alpha = p[3].min(255 - m);
        if alpha == 0 {
            *p = TRANSPARENT;
        } else {
            p[3] = alpha;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn opaque_extent(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        let mut out: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in img.enumerate_pixels() {
            if p[3] > 0 {
                out = Some(match out {
                    None => (x, y, x, y),
                    Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x), d.max(y)),
                });
            }
        }
        out
    }

    #[test]
    fn test_clear() {
        let mut img = RgbaImage::from_pixel(4, 4, RED);
        clear(&mut img);
        assert!(img.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_blend_opaque_replaces() {
        let mut dst = Rgba([0, 0, 255, 255]);
        blend_over(&mut dst, RED);
        assert_eq!(dst, RED);
    }

    #[test]
    fn test_blend_transparent_is_noop() {
        let mut dst = Rgba([0, 0, 255, 255]);
        blend_over(&mut dst, Rgba([255, 255, 255, 0]));
        assert_eq!(dst, Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_blend_half_over_opaque() {
        let mut dst = Rgba([0, 0, 0, 255]);
        blend_over(&mut dst, Rgba([200, 100, 0, 128]));
        assert_eq!(dst[3], 255);
        assert!((dst[0] as i32 - 100).abs() <= 1);
        assert!((dst[1] as i32 - 50).abs() <= 1);
    }

    #[test]
    fn test_blend_onto_transparent_keeps_color() {
        let mut dst = TRANSPARENT;
        blend_over(&mut dst, Rgba([10, 20, 30, 100]));
        assert_eq!(dst, Rgba([10, 20, 30, 100]));
    }

    #[test]
    fn test_draw_image_stretches() {
        let src = RgbImage::from_pixel(2, 2, Rgb([9, 8, 7]));
        let mut dst = RgbaImage::new(10, 10);
        draw_image(&mut dst, &src, Rect::new(2.0, 3.0, 4.0, 6.0));
        assert_eq!(opaque_extent(&dst), Some((2, 3, 5, 8)));
        assert_eq!(*dst.get_pixel(2, 3), Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn test_draw_image_clips_negative_offset() {
        let mut src = RgbImage::new(4, 1);
        for x in 0..4 {
            src.put_pixel(x, 0, Rgb([x as u8 * 10, 0, 0]));
        }
        let mut dst = RgbaImage::new(2, 1);
        // 4 px source into an 8 px rect starting at -4: only the right half lands.
        draw_image(&mut dst, &src, Rect::new(-4.0, 0.0, 8.0, 1.0));
        assert_eq!(dst.get_pixel(0, 0)[0], 20);
        assert_eq!(dst.get_pixel(1, 0)[0], 20);
    }

    #[test]
    fn test_draw_image_empty_rect_is_noop() {
        let src = RgbImage::from_pixel(2, 2, Rgb([1, 1, 1]));
        let mut dst = RgbaImage::new(4, 4);
        draw_image(&mut dst, &src, Rect::new(0.0, 0.0, 0.0, 4.0));
        draw_image(&mut dst, &src, Rect::new(0.0, 0.0, -3.0, 4.0));
        assert!(opaque_extent(&dst).is_none());
    }

    #[test]
    fn test_draw_image_respects_source_alpha() {
        let src = RgbaImage::from_pixel(1, 1, TRANSPARENT);
        let mut dst = RgbaImage::from_pixel(2, 2, RED);
        draw_image(&mut dst, &src, Rect::new(0.0, 0.0, 2.0, 2.0));
        assert!(dst.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_erase_ellipse_punches_hole() {
        let mut img = RgbaImage::from_pixel(20, 20, RED);
        let e = Ellipse {
            cx: 10.0,
            cy: 10.0,
            rx: 4.0,
            ry: 4.0,
        };
        erase_ellipse(&mut img, &e);
        assert_eq!(img.get_pixel(10, 10)[3], 0);
        assert_eq!(*img.get_pixel(0, 0), RED);
        assert_eq!(*img.get_pixel(15, 10), RED);
    }

    #[test]
    fn test_hole_mask() {
        let e = Ellipse {
            cx: 5.0,
            cy: 5.0,
            rx: 2.0,
            ry: 2.0,
        };
        let mask = ellipse_hole_mask(Size::new(10, 10), &e);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(9, 9)[0], 255);
    }

    #[test]
    fn test_keep_unmasked_retains_interior_only() {
        let mut img = RgbaImage::from_pixel(10, 10, RED);
        let e = Ellipse {
            cx: 5.0,
            cy: 5.0,
            rx: 2.0,
            ry: 2.0,
        };
        let mask = ellipse_hole_mask(Size::new(10, 10), &e);
        keep_unmasked(&mut img, &mask);
        assert_eq!(*img.get_pixel(5, 5), RED);
        assert_eq!(*img.get_pixel(0, 0), TRANSPARENT);
        for (x, y, p) in img.enumerate_pixels() {
            let inside = e.contains(x as f32 + 0.5, y as f32 + 0.5);
            assert_eq!(p[3] == 255, inside, "pixel ({x},{y})");
        }
    }

    #[test]
    fn test_keep_unmasked_never_raises_alpha() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([1, 2, 3, 40]));
        let mask = GrayImage::from_pixel(2, 1, Luma([100]));
        keep_unmasked(&mut img, &mask);
        assert_eq!(img.get_pixel(0, 0)[3], 40);
    }
}
