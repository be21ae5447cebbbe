//! Alpha blending math for watermark compositing.
//!
//! The watermark is applied with straight (non-premultiplied) alpha:
//! `out = src * (1 - a) + wm * a`, where `a = alpha / 255`.
//!
//! Before blending, the watermark's alpha channel is halved
//! (`floor(alpha * 0.5)`), which is what makes the overlay translucent.

use image::{DynamicImage, ImageBuffer, Pixel, Rgba, RgbaImage};

/// Convert a watermark alpha value to its translucent counterpart.
///
/// Halves the value and truncates, so `255` becomes `127` and `1` becomes `0`.
#[must_use]
pub const fn translucent_alpha(alpha: u8) -> u8 {
    alpha / 2
}

/// Make a watermark translucent in-place.
///
/// Runs as a single pass over the raw RGBA buffer. Fully transparent pixels
/// are normalized to transparent black `(0, 0, 0, 0)`; every other pixel
/// keeps its color and gets [`translucent_alpha`] applied to its alpha.
pub fn make_translucent(watermark: &mut RgbaImage) {
    for px in watermark.chunks_exact_mut(4) {
        if px[3] == 0 {
            px.fill(0);
        } else {
            px[3] = translucent_alpha(px[3]);
        }
    }
}

/// Blend a single color channel with straight alpha.
///
/// Integer form of `src * (1 - a) + wm * a` with `a = alpha / 255`,
/// rounded half up. `alpha == 0` returns `src` and `alpha == 255` returns `wm`.
#[must_use]
pub fn blend_channel(src: u8, wm: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let value = (u32::from(src) * (255 - a) + u32::from(wm) * a + 127) / 255;
    u8::try_from(value).unwrap_or(u8::MAX)
}

/// Luminance of an RGB color with ITU-R 601-2 weights.
///
/// Fixed-point `0.299 R + 0.587 G + 0.114 B`, rounded, matching the usual
/// RGB to grayscale conversion.
#[must_use]
pub fn luminance(color: Rgba<u8>) -> u8 {
    let [r, g, b, _] = color.0;
    let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
    u8::try_from(l).unwrap_or(u8::MAX)
}

/// Top-left offset that centers an overlay on a base image.
///
/// Uses floor division. An overlay larger than the base on an axis yields 0
/// on that axis.
#[must_use]
pub fn center_offset(base_w: u32, base_h: u32, overlay_w: u32, overlay_h: u32) -> (u32, u32) {
    (
        base_w.saturating_sub(overlay_w) / 2,
        base_h.saturating_sub(overlay_h) / 2,
    )
}

/// Blend an RGBA overlay onto `base` with its top-left corner at `(x, y)`.
///
/// The base keeps its pixel layout for `Rgb8`, `Rgba8`, `Luma8` and `LumaA8`.
/// Grayscale bases blend the overlay's [`luminance`]. A base alpha channel is
/// blended toward the overlay's alpha with the same weight as the color
/// channels. Other layouts are narrowed to `Rgba8` (with alpha) or `Rgb8`
/// (without) first.
///
/// Overlay pixels with alpha 0 leave the base untouched, and the overlay is
/// clipped to the base bounds.
pub fn blend_onto(base: &mut DynamicImage, overlay: &RgbaImage, x: u32, y: u32) {
    match base {
        DynamicImage::ImageRgb8(img) => blend_region(img, overlay, x, y, |px, wm| {
            for ch in 0..3 {
                px[ch] = blend_channel(px[ch], wm[ch], wm[3]);
            }
        }),
        DynamicImage::ImageRgba8(img) => blend_region(img, overlay, x, y, |px, wm| {
            for ch in 0..4 {
                px[ch] = blend_channel(px[ch], wm[ch], wm[3]);
            }
        }),
        DynamicImage::ImageLuma8(img) => blend_region(img, overlay, x, y, |px, wm| {
            px[0] = blend_channel(px[0], luminance(*wm), wm[3]);
        }),
        DynamicImage::ImageLumaA8(img) => blend_region(img, overlay, x, y, |px, wm| {
            px[0] = blend_channel(px[0], luminance(*wm), wm[3]);
            px[1] = blend_channel(px[1], wm[3], wm[3]);
        }),
        other => {
            *other = if other.color().has_alpha() {
                DynamicImage::ImageRgba8(other.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(other.to_rgb8())
            };
            blend_onto(other, overlay, x, y);
        }
    }
}

/// Walk the overlapping region and hand each visible overlay pixel to `blend`.
fn blend_region<P, F>(
    target: &mut ImageBuffer<P, Vec<u8>>,
    overlay: &RgbaImage,
    x: u32,
    y: u32,
    mut blend: F,
) where
    P: Pixel<Subpixel = u8>,
    F: FnMut(&mut P, &Rgba<u8>),
{
    let x_end = x.saturating_add(overlay.width()).min(target.width());
    let y_end = y.saturating_add(overlay.height()).min(target.height());

    for ty in y..y_end {
        for tx in x..x_end {
            let wm = overlay.get_pixel(tx - x, ty - y);
            if wm[3] == 0 {
                continue;
            }
            blend(target.get_pixel_mut(tx, ty), wm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, LumaA, Rgb, RgbImage};

    #[test]
    fn translucent_alpha_truncates() {
        assert_eq!(translucent_alpha(255), 127);
        assert_eq!(translucent_alpha(200), 100);
        assert_eq!(translucent_alpha(3), 1);
        assert_eq!(translucent_alpha(1), 0);
        assert_eq!(translucent_alpha(0), 0);
    }

    #[test]
    fn make_translucent_clears_transparent_and_halves_the_rest() {
        let mut wm = RgbaImage::new(3, 1);
        wm.put_pixel(0, 0, Rgba([10, 20, 30, 0]));
        wm.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        wm.put_pixel(2, 0, Rgba([40, 50, 60, 99]));

        make_translucent(&mut wm);

        assert_eq!(*wm.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*wm.get_pixel(1, 0), Rgba([10, 20, 30, 127]));
        assert_eq!(*wm.get_pixel(2, 0), Rgba([40, 50, 60, 49]));
    }

    #[test]
    fn blend_channel_endpoints() {
        for v in [0u8, 17, 128, 255] {
            assert_eq!(blend_channel(v, 200, 0), v);
            assert_eq!(blend_channel(v, 200, 255), 200);
        }
    }

    #[test]
    fn blend_channel_half_alpha_matches_formula() {
        let a = 127.0_f32 / 255.0;
        for (src, wm) in [(0u8, 255u8), (255, 0), (100, 200), (37, 91)] {
            let expected = f32::from(src) * (1.0 - a) + f32::from(wm) * a;
            let got = f32::from(blend_channel(src, wm, 127));
            assert!(
                (got - expected).abs() <= 0.5,
                "src={src} wm={wm}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn center_offset_uses_floor_division() {
        assert_eq!(center_offset(800, 600, 200, 150), (300, 225));
        assert_eq!(center_offset(7, 5, 1, 1), (3, 2));
        assert_eq!(center_offset(3, 3, 0, 0), (1, 1));
        assert_eq!(center_offset(10, 10, 20, 20), (0, 0));
    }

    #[test]
    fn blend_onto_rgb_only_touches_overlay_region() {
        let mut base = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 10, 10])));
        let overlay = RgbaImage::from_pixel(2, 2, Rgba([250, 250, 250, 255]));

        blend_onto(&mut base, &overlay, 1, 1);

        let img = base.as_rgb8().unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgb([10, 10, 10]));
        assert_eq!(*img.get_pixel(3, 3), Rgb([10, 10, 10]));
        assert_eq!(*img.get_pixel(1, 1), Rgb([250, 250, 250]));
        assert_eq!(*img.get_pixel(2, 2), Rgb([250, 250, 250]));
    }

    #[test]
    fn blend_onto_skips_transparent_overlay_pixels() {
        let mut base = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 1, Rgb([1, 2, 3])));
        let mut overlay = RgbaImage::new(2, 1);
        overlay.put_pixel(1, 0, Rgba([200, 200, 200, 127]));

        blend_onto(&mut base, &overlay, 0, 0);

        let img = base.as_rgb8().unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgb([1, 2, 3]));
        assert_ne!(*img.get_pixel(1, 0), Rgb([1, 2, 3]));
    }

    #[test]
    fn blend_onto_clips_to_base_bounds() {
        let mut base = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let overlay = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));

        blend_onto(&mut base, &overlay, 1, 1);

        let img = base.as_rgb8().unwrap();
        assert_eq!(*img.get_pixel(1, 1), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn blend_onto_rgba_blends_base_alpha_toward_overlay_alpha() {
        let mut base =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 42])));
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_onto(&mut base, &overlay, 0, 0);
        assert_eq!(*base.as_rgba8().unwrap().get_pixel(0, 0), Rgba([255, 255, 255, 255]));

        // 42 * 128/255 + 127 * 127/255
        let mut base =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 42])));
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 127]));
        blend_onto(&mut base, &overlay, 0, 0);
        assert_eq!(*base.as_rgba8().unwrap().get_pixel(0, 0), Rgba([127, 127, 127, 84]));
    }

    #[test]
    fn blend_onto_grayscale_uses_overlay_luminance() {
        let mut base = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([0])));
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        blend_onto(&mut base, &overlay, 0, 0);
        assert_eq!(*base.as_luma8().unwrap().get_pixel(0, 0), Luma([255]));

        let mut base = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(1, 1, LumaA([0, 9])));
        blend_onto(&mut base, &overlay, 0, 0);
        assert_eq!(*base.as_luma_alpha8().unwrap().get_pixel(0, 0), LumaA([255, 255]));

        let red = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let mut base = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([0])));
        blend_onto(&mut base, &red, 0, 0);
        assert_eq!(*base.as_luma8().unwrap().get_pixel(0, 0), Luma([76]));
    }

    #[test]
    fn luminance_uses_601_weights() {
        assert_eq!(luminance(Rgba([255, 0, 0, 255])), 76);
        assert_eq!(luminance(Rgba([0, 255, 0, 255])), 150);
        assert_eq!(luminance(Rgba([0, 0, 255, 255])), 29);
        assert_eq!(luminance(Rgba([255, 255, 255, 0])), 255);
        assert_eq!(luminance(Rgba([0, 0, 0, 255])), 0);
    }

    #[test]
    fn blend_onto_narrows_sixteen_bit_bases() {
        let mut base = DynamicImage::new_rgb16(2, 2);
        let overlay = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));

        blend_onto(&mut base, &overlay, 0, 0);

        let img = base.as_rgb8().expect("narrowed to Rgb8");
        assert_eq!(*img.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*img.get_pixel(1, 1), Rgb([0, 0, 0]));

        let mut base = DynamicImage::new_rgba16(1, 1);
        blend_onto(&mut base, &overlay, 0, 0);
        assert!(base.as_rgba8().is_some());
    }
}
