//! High-level image operations.
//!
//! These functions combine decoding, pixel work, and re-encoding into the
//! data-URL-in, data-URL-out shape the HTTP handlers need. Results are always
//! PNG regardless of what the client sent.

use super::calculations::calculate_fit_dimensions;
use super::codec::{ImagingError, decode_data_url, encode_png_data_url};
use super::filters::apply_named;
use image::DynamicImage;
use image::imageops::FilterType;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Tunables for filter and resize requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSettings {
    /// Gaussian sigma for the `blur` filter.
    pub blur_sigma: f32,
    /// Largest width or height a stretch resize may ask for.
    pub max_dimension: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            max_dimension: 10_000,
        }
    }
}

/// A resized image ready to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Decode `data_url`, apply the filter called `filter`, and re-encode as PNG.
pub fn filter_data_url(data_url: &str, filter: &str, settings: &ImageSettings) -> Result<String> {
    let img = decode_data_url(data_url)?;
    let filtered = apply_named(img, filter, settings.blur_sigma);
    encode_png_data_url(&filtered)
}

/// Scale a bitmap with Lanczos3 resampling.
///
/// With `maintain_aspect` the image is shrunk to fit inside `width x height`
/// and never enlarged. Without it, the output is exactly `width x height`.
pub fn resize(img: DynamicImage, width: u32, height: u32, maintain_aspect: bool) -> DynamicImage {
    let (target_w, target_h) = if maintain_aspect {
        calculate_fit_dimensions((img.width(), img.height()), (width, height))
    } else {
        (width, height)
    };

    if (target_w, target_h) == (img.width(), img.height()) {
        return img;
    }
    img.resize_exact(target_w, target_h, FilterType::Lanczos3)
}

/// Decode `data_url`, resize it, and re-encode as PNG.
///
/// Callers must reject zero dimensions before getting here. A stretch
/// (`maintain_aspect == false`) allocates the target size, so targets above
/// `settings.max_dimension` are refused as malformed input. A fit never
/// enlarges, so its bound may be anything.
pub fn resize_data_url(
    data_url: &str,
    width: u32,
    height: u32,
    maintain_aspect: bool,
    settings: &ImageSettings,
) -> Result<ResizedImage> {
    if !maintain_aspect && (width > settings.max_dimension || height > settings.max_dimension) {
        return Err(ImagingError::DimensionsTooLarge {
            width,
            height,
            max: settings.max_dimension,
        });
    }

    let img = decode_data_url(data_url)?;
    let resized = resize(img, width, height, maintain_aspect);
    Ok(ResizedImage {
        data_url: encode_png_data_url(&resized)?,
        width: resized.width(),
        height: resized.height(),
    })
}
