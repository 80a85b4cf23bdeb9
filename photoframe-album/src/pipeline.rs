use crate::config::Orientation;
use crate::error::{AlbumError, Result};
use css_color::Srgb;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgba};

/// Gaussian sigma used for the blurred letterbox background.
const BLUR_SIGMA: f32 = 8.0;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Canvas for a panel: native resolution, swapped to (height, width) for vertical frames.
pub fn target_dimensions(resolution: (u32, u32), orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::Horizontal => resolution,
        Orientation::Vertical => (resolution.1, resolution.0),
    }
}

/// Parse a CSS colour string; `None` or an empty string means white.
pub fn parse_background_color(color: Option<&str>) -> Result<Rgba<u8>> {
    let Some(c) = color.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(WHITE);
    };
    let parsed = c
        .parse::<Srgb>()
        .map_err(|_| AlbumError::config(format!("Invalid background color '{c}'.")))?;
    let r = (parsed.red * 255.0).round().clamp(0.0, 255.0) as u8;
    let g = (parsed.green * 255.0).round().clamp(0.0, 255.0) as u8;
    let b = (parsed.blue * 255.0).round().clamp(0.0, 255.0) as u8;
    tracing::trace!(input=%c, r=%r, g=%g, b=%b, "resolved background color");
    Ok(Rgba([r, g, b, 255]))
}

/// Half of the leftover space, rounded half to even (an odd 3px gap gives 2, 5px gives 2).
fn half_gap(outer: u32, inner: u32) -> i64 {
    let diff = outer.saturating_sub(inner) as i64;
    let half = diff / 2;
    if diff % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

fn centered_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (half_gap(outer.0, inner.0), half_gap(outer.1, inner.1))
}

/// Scale `img` to fit inside `dims` keeping its aspect ratio and centre it on a solid canvas.
pub fn pad_solid(img: &DynamicImage, dims: (u32, u32), color: Rgba<u8>) -> DynamicImage {
    let (w, h) = (dims.0.max(1), dims.1.max(1));
    let resized = img.resize(w, h, FilterType::Lanczos3);
    let mut canvas: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_pixel(w, h, color);
    let (x, y) = centered_offset((w, h), (resized.width(), resized.height()));
    imageops::overlay(&mut canvas, &resized, x, y);
    DynamicImage::ImageRgba8(canvas)
}

/// Like [`pad_solid`] but the letterbox is a blurred, cropped-to-fill copy of the image itself.
pub fn pad_blur(img: &DynamicImage, dims: (u32, u32)) -> DynamicImage {
    let (w, h) = (dims.0.max(1), dims.1.max(1));
    let background = img.resize_to_fill(w, h, FilterType::Triangle);
    let mut canvas = imageops::blur(&background.to_rgba8(), BLUR_SIGMA);
    let resized = img.resize(w, h, FilterType::Lanczos3);
    let (x, y) = centered_offset((w, h), (resized.width(), resized.height()));
    imageops::overlay(&mut canvas, &resized.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb(rgb)))
    }

    #[test]
    fn solid_pad_centers_scaled_source_on_white() {
        let src = solid(100, 200, [200, 0, 0]);
        let out = pad_solid(&src, (300, 300), parse_background_color(None).unwrap());
        assert_eq!(out.dimensions(), (300, 300));
        // scaled to 150x300, offset ((300-150)/2, 0)
        assert_eq!(out.get_pixel(0, 150), WHITE);
        assert_eq!(out.get_pixel(74, 150), WHITE);
        assert_eq!(out.get_pixel(225, 150), WHITE);
        assert_eq!(out.get_pixel(299, 0), WHITE);
        let inside = out.get_pixel(150, 150);
        assert!(inside[0] > 150 && inside[1] < 50 && inside[2] < 50, "{inside:?}");
        let left_edge = out.get_pixel(76, 10);
        assert!(left_edge[0] > 150 && left_edge[1] < 50, "{left_edge:?}");
    }

    #[test]
    fn solid_pad_uses_configured_color() {
        let src = solid(200, 100, [0, 0, 0]);
        let color = parse_background_color(Some("#00ff00")).unwrap();
        let out = pad_solid(&src, (200, 200), color);
        assert_eq!(out.get_pixel(100, 10), Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(100, 190), Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(100, 100)[1], 0);
    }

    #[test]
    fn background_color_parsing() {
        assert_eq!(parse_background_color(Some("")).unwrap(), WHITE);
        assert_eq!(
            parse_background_color(Some("#000000")).unwrap(),
            Rgba([0, 0, 0, 255])
        );
        assert_eq!(
            parse_background_color(Some(" #ff0000 ")).unwrap(),
            Rgba([255, 0, 0, 255])
        );
        assert!(matches!(
            parse_background_color(Some("not-a-colour")),
            Err(AlbumError::Configuration(_))
        ));
    }

    #[test]
    fn blur_pad_fills_canvas_from_image() {
        let src = solid(100, 200, [10, 20, 30]);
        let out = pad_blur(&src, (300, 300));
        assert_eq!(out.dimensions(), (300, 300));
        // background comes from the image itself, not white
        let corner = out.get_pixel(5, 5);
        assert!(corner[0] < 40 && corner[1] < 50 && corner[2] < 60, "{corner:?}");
    }

    #[test]
    fn odd_gaps_round_half_to_even() {
        assert_eq!(centered_offset((300, 300), (150, 300)), (75, 0));
        assert_eq!(centered_offset((4, 6), (3, 3)), (0, 2));
        assert_eq!(centered_offset((10, 10), (5, 9)), (2, 0));
        assert_eq!(centered_offset((10, 10), (3, 10)), (4, 0));
        assert_eq!(centered_offset((5, 5), (8, 5)), (0, 0));
    }

    #[test]
    fn vertical_target_swaps_resolution() {
        assert_eq!(
            target_dimensions((800, 480), Orientation::Vertical),
            (480, 800)
        );
        assert_eq!(
            target_dimensions((800, 480), Orientation::Horizontal),
            (800, 480)
        );
    }
}
