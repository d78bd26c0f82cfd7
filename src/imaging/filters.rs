//! Named pixel filters.
//!
//! | Name | Implementation |
//! |---|---|
//! | `grayscale` | `DynamicImage::grayscale`, re-expanded to RGBA (alpha kept) |
//! | `sepia` | per-pixel matrix, rounded and capped at 255 |
//! | `invert` | per-pixel `255 - c` on r, g, b |
//! | `blur` | `DynamicImage::blur` (Gaussian) |
//! | `sharpen` | 3x3 sharpen kernel via `filter3x3` |
//! | `edge` | 3x3 Laplacian edge-find kernel via `filter3x3` |
//!
//! Sepia and invert touch each pixel independently, so they run as one
//! parallel pass over the RGBA buffer. Every filter leaves alpha alone.
//!
//! An unrecognized name is not an error: the bitmap passes through untouched.

use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;

/// 3x3 sharpen: strong centre, negative ring. Sums to 1.
const SHARPEN_KERNEL: [f32; 9] = [
    -0.125, -0.125, -0.125, -0.125, 2.0, -0.125, -0.125, -0.125, -0.125,
];

/// 3x3 Laplacian; sums to zero so flat regions go black.
const EDGE_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

/// A filter the engine knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Grayscale,
    Sepia,
    Invert,
    Blur,
    Sharpen,
    Edge,
}

impl Filter {
    pub const ALL: [Filter; 6] = [
        Filter::Grayscale,
        Filter::Sepia,
        Filter::Invert,
        Filter::Blur,
        Filter::Sharpen,
        Filter::Edge,
    ];

    /// Look up a filter by its wire name. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Invert => "invert",
            Filter::Blur => "blur",
            Filter::Sharpen => "sharpen",
            Filter::Edge => "edge",
        }
    }

    pub fn apply(self, img: DynamicImage, blur_sigma: f32) -> DynamicImage {
        match self {
            Filter::Grayscale => DynamicImage::ImageRgba8(img.grayscale().to_rgba8()),
            Filter::Sepia => DynamicImage::ImageRgba8(sepia(img.to_rgba8())),
            Filter::Invert => DynamicImage::ImageRgba8(invert(img.to_rgba8())),
            Filter::Blur => img.blur(blur_sigma),
            Filter::Sharpen => convolve_keeping_alpha(&img, &SHARPEN_KERNEL),
            Filter::Edge => convolve_keeping_alpha(&img, &EDGE_KERNEL),
        }
    }
}

/// Apply the filter called `name`, or return `img` unchanged if there is none.
pub fn apply_named(img: DynamicImage, name: &str, blur_sigma: f32) -> DynamicImage {
    match Filter::from_name(name) {
        Some(filter) => filter.apply(img, blur_sigma),
        None => {
            tracing::warn!(filter = name, "unknown filter, returning image unchanged");
            img
        }
    }
}

fn sepia_channel(value: f32) -> u8 {
    value.round().min(255.0) as u8
}

fn sepia(mut buf: RgbaImage) -> RgbaImage {
    buf.par_chunks_exact_mut(4).for_each(|px| {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        px[0] = sepia_channel(0.393 * r + 0.769 * g + 0.189 * b);
        px[1] = sepia_channel(0.349 * r + 0.686 * g + 0.168 * b);
        px[2] = sepia_channel(0.272 * r + 0.534 * g + 0.131 * b);
    });
    buf
}

fn invert(mut buf: RgbaImage) -> RgbaImage {
    buf.par_chunks_exact_mut(4).for_each(|px| {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    });
    buf
}

/// Run a 3x3 kernel over the colour channels, then restore the source alpha.
///
/// `filter3x3` convolves every channel; a zero-sum kernel would otherwise wipe
/// out alpha entirely.
fn convolve_keeping_alpha(img: &DynamicImage, kernel: &[f32; 9]) -> DynamicImage {
    let source = img.to_rgba8();
    let mut out = DynamicImage::ImageRgba8(source.clone())
        .filter3x3(kernel)
        .to_rgba8();

    out.par_chunks_exact_mut(4)
        .zip(source.par_chunks_exact(4))
        .for_each(|(dst, src)| dst[3] = src[3]);

    DynamicImage::ImageRgba8(out)
}
