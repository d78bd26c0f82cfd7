//! Parameter types for image operations.
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`OutputFormat`]: What an export is encoded as, resolved from the client's format hint.

use super::codec::ImagingError;
use image::ImageFormat;

/// Quality setting for lossy image encoding (1-100).
///
/// Only the constructors can build one, so the value is always in range:
///
/// ```
/// # use drawpro_server::imaging::Quality;
/// assert_eq!(Quality::new(150).value(), 100);
/// ```
///
/// ```compile_fail
/// # use drawpro_server::imaging::Quality;
/// let unclamped = Quality(150);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Build from an untrusted request value; negatives clamp to the minimum.
    pub fn from_request(value: i64) -> Self {
        Self::new(value.clamp(0, 100) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Target encoding for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless, maximum compression.
    Png,
    /// Lossy; alpha is flattened onto white first.
    Jpeg,
    /// Anything else the `image` crate can name from an extension (webp, bmp, tiff, ...).
    Other(ImageFormat),
}

impl OutputFormat {
    /// Resolve a client-supplied hint such as `"png"`, `"JPG"` or `"webp"`.
    ///
    /// The hint is also used verbatim as the export's file extension, so only
    /// plain alphanumeric hints are accepted.
    pub fn from_hint(hint: &str) -> Result<Self, ImagingError> {
        if hint.is_empty() || !hint.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ImagingError::UnsupportedFormat(hint.to_string()));
        }
        match hint.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            other => ImageFormat::from_extension(other)
                .map(OutputFormat::Other)
                .ok_or_else(|| ImagingError::UnsupportedFormat(hint.to_string())),
        }
    }
}
