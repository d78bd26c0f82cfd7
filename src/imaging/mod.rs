//! Image processing in pure Rust, on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `base64` + `image::load_from_memory` (format sniffed from bytes) |
//! | **Encode** | `PngEncoder`, `JpegEncoder`, `DynamicImage::write_to` |
//! | **Filters** | `grayscale`, `blur`, `filter3x3`; rayon per-pixel passes for sepia/invert |
//! | **Resize** | `resize_exact` with `Lanczos3` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Quality and output format
//! - **Codec**: data URL decoding, PNG/JPEG/other encoding
//! - **Filters**: the named filter set
//! - **Operations**: High-level functions combining codec + pixel work

mod calculations;
pub mod codec;
pub mod filters;
pub mod operations;
mod params;

pub use calculations::calculate_fit_dimensions;
pub use codec::{ImagingError, decode_data_url, encode, encode_png_data_url};
pub use filters::{Filter, apply_named};
pub use operations::{ImageSettings, ResizedImage, filter_data_url, resize, resize_data_url};
pub use params::{OutputFormat, Quality};
