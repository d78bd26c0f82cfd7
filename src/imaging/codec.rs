//! Data URL decoding and image encoding.
//!
//! The browser sends canvas snapshots as `data:image/png;base64,<payload>`.
//! Decoding ignores the header entirely: the payload is base64-decoded and the
//! `image` crate sniffs the actual format from the bytes.
//!
//! | Output | Encoder |
//! |---|---|
//! | PNG | `PngEncoder`, best compression + adaptive filtering |
//! | JPEG | `JpegEncoder` at the requested quality, alpha flattened onto white |
//! | anything else | `DynamicImage::write_to` with the format named by the extension |

use super::params::{OutputFormat, Quality};
use crate::error::ErrorKind;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::io::Cursor;
use thiserror::Error;

/// Header used for every image the server hands back to the browser.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Malformed data URL: missing ',' separator")]
    MissingSeparator,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Unrecognized image data: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Requested size {width}x{height} exceeds the limit of {max} pixels per side")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Encoding failed: {0}")]
    Encode(#[source] image::ImageError),
}

impl ImagingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImagingError::MissingSeparator
            | ImagingError::Base64(_)
            | ImagingError::Decode(_)
            | ImagingError::DimensionsTooLarge { .. } => ErrorKind::MalformedInput,
            ImagingError::UnsupportedFormat(_) | ImagingError::Encode(_) => ErrorKind::Codec,
        }
    }
}

/// Decode a `<header>,<base64>` data URL into a bitmap.
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage, ImagingError> {
    let (_header, payload) = data_url
        .split_once(',')
        .ok_or(ImagingError::MissingSeparator)?;

    let bytes = if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)?
    } else {
        STANDARD.decode(payload)?
    };

    image::load_from_memory(&bytes).map_err(ImagingError::Decode)
}

/// Encode a bitmap for export.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, ImagingError> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut bytes,
                CompressionType::Best,
                PngFilterType::Adaptive,
            );
            img.write_with_encoder(encoder)
                .map_err(ImagingError::Encode)?;
        }
        OutputFormat::Jpeg => {
            let opaque = if img.color().has_alpha() {
                flatten_onto_white(img)
            } else {
                img.to_rgb8()
            };
            let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value() as u8);
            DynamicImage::ImageRgb8(opaque)
                .write_with_encoder(encoder)
                .map_err(ImagingError::Encode)?;
        }
        OutputFormat::Other(fmt) => {
            if !fmt.writing_enabled() {
                return Err(ImagingError::UnsupportedFormat(
                    fmt.extensions_str().first().copied().unwrap_or("?").to_string(),
                ));
            }
            let mut cursor = Cursor::new(bytes);
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut cursor, fmt)
                .map_err(ImagingError::Encode)?;
            bytes = cursor.into_inner();
        }
    }
    Ok(bytes)
}

/// Encode as PNG (default compression) and wrap in a `data:image/png;base64,` URL.
pub fn encode_png_data_url(img: &DynamicImage) -> Result<String, ImagingError> {
    let mut bytes = Vec::new();
    img.write_with_encoder(PngEncoder::new(&mut bytes))
        .map_err(ImagingError::Encode)?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&bytes)))
}

/// Composite a bitmap over an opaque white background (alpha-over-white).
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());

    rgb.par_chunks_exact_mut(3)
        .zip(rgba.par_chunks_exact(4))
        .for_each(|(dst, src)| {
            let alpha = src[3] as u32;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
            }
        });

    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{data_url_for, solid_rgba};
    use image::{ImageFormat, Rgba};

    #[test]
    fn decode_round_trips_png_data_url() {
        let img = solid_rgba(3, 2, [10, 20, 30, 40]);
        let decoded = decode_data_url(&data_url_for(&img)).unwrap();

        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
        assert_eq!(decoded.to_rgba8().get_pixel(2, 1), &Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn decode_ignores_header_and_sniffs_format() {
        let img = solid_rgba(1, 1, [1, 2, 3, 255]);
        let url = data_url_for(&img).replace("image/png", "image/jpeg");
        assert!(decode_data_url(&url).is_ok());
    }

    #[test]
    fn decode_tolerates_line_breaks_in_payload() {
        let img = solid_rgba(4, 4, [9, 9, 9, 255]);
        let url = data_url_for(&img);
        let (head, body) = url.split_once(',').unwrap();
        let wrapped: String = body
            .as_bytes()
            .chunks(8)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(decode_data_url(&format!("{head},{wrapped}")).is_ok());
    }

    #[test]
    fn decode_without_comma_is_malformed() {
        let err = decode_data_url("data:image/png;base64").unwrap_err();
        assert!(matches!(err, ImagingError::MissingSeparator));
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn decode_bad_base64_is_malformed() {
        let err = decode_data_url("data:image/png;base64,@@@not-base64@@@").unwrap_err();
        assert!(matches!(err, ImagingError::Base64(_)));
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn decode_non_image_bytes_is_malformed() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"hello world"));
        let err = decode_data_url(&url).unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn encode_png_is_lossless() {
        let img = solid_rgba(5, 5, [200, 100, 50, 128]);
        let bytes = encode(&img, OutputFormat::Png, Quality::default()).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back, img.to_rgba8());
    }

    #[test]
    fn encode_jpeg_drops_alpha_and_uses_white_background() {
        let img = solid_rgba(8, 8, [0, 0, 0, 0]);
        let bytes = encode(&img, OutputFormat::Jpeg, Quality::new(90)).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let back = image::load_from_memory(&bytes).unwrap();
        assert!(!back.color().has_alpha());
        let px = back.to_rgb8().get_pixel(4, 4).0;
        assert!(px.iter().all(|&c| c >= 250), "expected white, got {px:?}");
    }

    #[test]
    fn encode_jpeg_accepts_opaque_input() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 30])));
        let bytes = encode(&img, OutputFormat::Jpeg, Quality::new(1)).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn encode_other_format_uses_generic_writer() {
        let img = solid_rgba(2, 2, [1, 2, 3, 255]);
        let bytes = encode(&img, OutputFormat::Other(ImageFormat::Bmp), Quality::default()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Bmp);
    }

    #[test]
    fn encode_format_without_encoder_is_codec_error() {
        let img = solid_rgba(2, 2, [1, 2, 3, 255]);
        // DDS is decode-only in the image crate
        let err = encode(&img, OutputFormat::Other(ImageFormat::Dds), Quality::default())
            .unwrap_err();
        assert!(matches!(err, ImagingError::UnsupportedFormat(_)));
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn png_data_url_has_prefix_and_decodes() {
        let img = solid_rgba(2, 3, [7, 8, 9, 255]);
        let url = encode_png_data_url(&img).unwrap();

        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
        let back = decode_data_url(&url).unwrap();
        assert_eq!(back.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn flatten_blends_alpha_over_white() {
        let mut buf = image::RgbaImage::new(3, 1);
        buf.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        buf.put_pixel(1, 0, Rgba([255, 0, 0, 0]));
        buf.put_pixel(2, 0, Rgba([0, 0, 0, 128]));

        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(buf));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(flat.get_pixel(1, 0).0, [255, 255, 255]);
        // 255 * 127 / 255 = 127
        assert_eq!(flat.get_pixel(2, 0).0, [127, 127, 127]);
    }
}
