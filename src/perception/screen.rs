//! Screenshot handling: JPEG/base64 encoding for model requests and marker
//! overlays for inspecting grounding results.
use base64::Engine as _;

use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::types::Point;

/// A screenshot ready to embed in a chat request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

/// Decode any supported image, flatten to RGB and re-encode as base64 JPEG.
pub fn encode_jpeg_base64(src_bytes: &[u8]) -> ArenaResult<EncodedImage> {
    let img = image::load_from_memory(src_bytes)
        .map_err(|e| ArenaError::Perception(format!("load image: {e}")))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(rgb)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .map_err(|e| ArenaError::Perception(format!("JPEG encode: {e}")))?;

    Ok(EncodedImage {
        base64: base64::engine::general_purpose::STANDARD.encode(&out),
        width,
        height,
    })
}

/// File extension matching the encoded bytes, `"bin"` when unknown.
pub fn guess_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "png",
        Ok(image::ImageFormat::Jpeg) => "jpg",
        Ok(image::ImageFormat::Bmp) => "bmp",
        Ok(image::ImageFormat::WebP) => "webp",
        _ => "bin",
    }
}

/// Draw a hollow red square (half-size 5 px, 3 px stroke) at every point.
/// Returns PNG-encoded bytes.
pub fn draw_markers(src_bytes: &[u8], points: &[Point]) -> ArenaResult<Vec<u8>> {
    let img = image::load_from_memory(src_bytes)
        .map_err(|e| ArenaError::Perception(format!("load image: {e}")))?;
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();

    const HALF: i64 = 5;
    const STROKE: i64 = 3;
    for point in points {
        let (cx, cy) = point.to_pixels(w, h);
        let (cx, cy) = (cx as i64, cy as i64);
        for dy in -HALF - STROKE / 2..=HALF + STROKE / 2 {
            for dx in -HALF - STROKE / 2..=HALF + STROKE / 2 {
                let on_edge = (dx.abs() - HALF).abs() <= STROKE / 2 && dy.abs() <= HALF + STROKE / 2
                    || (dy.abs() - HALF).abs() <= STROKE / 2 && dx.abs() <= HALF + STROKE / 2;
                let (x, y) = (cx + dx, cy + dy);
                if on_edge && x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    blend_pixel(canvas.get_pixel_mut(x as u32, y as u32), 255, 0, 0, 255);
                }
            }
        }
    }

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| ArenaError::Perception(format!("PNG encode: {e}")))?;
    Ok(out)
}

fn blend_pixel(pixel: &mut image::Rgba<u8>, r: u8, g: u8, b: u8, a: u8) {
    let alpha = a as f32 / 255.0;
    pixel[0] = (pixel[0] as f32 * (1.0 - alpha) + r as f32 * alpha).round() as u8;
    pixel[1] = (pixel[1] as f32 * (1.0 - alpha) + g as f32 * alpha).round() as u8;
    pixel[2] = (pixel[2] as f32 * (1.0 - alpha) + b as f32 * alpha).round() as u8;
}

#[cfg(test)]
pub(crate) fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}
