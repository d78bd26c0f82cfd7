//! Shared test utilities for the drawpro-server test suite.
//!
//! Small bitmap builders, data URL wrappers, and clock/mtime helpers used by
//! the store, export, and imaging tests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{NaiveDate, NaiveDateTime};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use std::time::SystemTime;

// =========================================================================
// Bitmaps
// =========================================================================

/// A `w x h` RGBA image filled with one colour.
pub fn solid_rgba(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
}

/// An RGBA image where every pixel differs, with varying alpha.
pub fn gradient_rgba(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
        Rgba([
            (x * 255 / w.max(1)) as u8,
            (y * 255 / h.max(1)) as u8,
            ((x + y) * 17 % 256) as u8,
            (255 - (x * 7 + y * 3) % 128) as u8,
        ])
    }))
}

// =========================================================================
// Data URLs
// =========================================================================

/// Encode `img` as PNG and wrap it in a data URL.
pub fn data_url_for(img: &DynamicImage) -> String {
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();
    data_url_from_bytes("image/png", png.get_ref())
}

pub fn data_url_from_bytes(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

// =========================================================================
// Time
// =========================================================================

/// 2024-01-02 at the given time of day.
pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

/// Force a file's modification time.
pub fn set_mtime(path: &Path, when: SystemTime) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(when).unwrap();
}
