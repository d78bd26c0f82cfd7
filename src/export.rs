//! Writes exported images to disk for later download.
//!
//! Each export becomes `<exports_dir>/export_<YYYYMMDD_HHMMSS>.<ext>`, where
//! `<ext>` is the format hint exactly as the client sent it. Nothing else is
//! recorded; the file is the export. It is served back at
//! `/exports/<filename>` and never expires.

use crate::error::ErrorKind;
use crate::imaging::{ImagingError, OutputFormat, Quality, encode};
use crate::naming::{timestamp_id, write_unique};
use chrono::{Local, NaiveDateTime};
use image::DynamicImage;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const EXPORT_PREFIX: &str = "export";

/// URL prefix under which export files are served.
pub const EXPORTS_ROUTE: &str = "/exports";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Imaging(e) => e.kind(),
            ExportError::Io(_) => ErrorKind::Storage,
        }
    }
}

/// Where an export landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    /// e.g. `export_20240102_030405`
    pub export_id: String,
    /// e.g. `export_20240102_030405.jpg`
    pub filename: String,
    /// e.g. `/exports/export_20240102_030405.jpg`
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ExportWriter {
    dir: PathBuf,
}

impl ExportWriter {
    /// Open a writer for `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encode `img` as `format_hint` and write it under a fresh export id.
    pub fn export(
        &self,
        img: &DynamicImage,
        format_hint: &str,
        quality: Quality,
    ) -> Result<ExportedImage, ExportError> {
        self.export_at(img, format_hint, quality, Local::now().naive_local())
    }

    /// [`export`](Self::export) with an explicit clock reading.
    pub fn export_at(
        &self,
        img: &DynamicImage,
        format_hint: &str,
        quality: Quality,
        now: NaiveDateTime,
    ) -> Result<ExportedImage, ExportError> {
        let format = OutputFormat::from_hint(format_hint)?;
        // Encode before touching the disk so a failed encode leaves no file behind.
        let bytes = encode(img, format, quality)?;

        let stem = timestamp_id(EXPORT_PREFIX, now);
        let export_id = write_unique(&self.dir, &stem, format_hint, &bytes)?;
        let filename = format!("{}.{}", export_id, format_hint);

        Ok(ExportedImage {
            path: format!("{}/{}", EXPORTS_ROUTE, filename),
            export_id,
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{at, solid_rgba};
    use image::ImageFormat;
    use tempfile::TempDir;

    fn writer() -> (TempDir, ExportWriter) {
        let tmp = TempDir::new().unwrap();
        let writer = ExportWriter::open(tmp.path().join("exports")).unwrap();
        (tmp, writer)
    }

    #[test]
    fn export_png_names_and_paths() {
        let (_tmp, writer) = writer();
        let out = writer
            .export_at(&solid_rgba(2, 2, [1, 2, 3, 4]), "png", Quality::default(), at(3, 4, 5))
            .unwrap();

        assert_eq!(out.export_id, "export_20240102_030405");
        assert_eq!(out.filename, "export_20240102_030405.png");
        assert_eq!(out.path, "/exports/export_20240102_030405.png");

        let bytes = fs::read(writer.dir().join(&out.filename)).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn export_jpg_keeps_hint_as_extension_and_has_no_alpha() {
        let (_tmp, writer) = writer();
        let out = writer
            .export(&solid_rgba(2, 2, [255, 0, 0, 128]), "jpg", Quality::new(90))
            .unwrap();

        assert!(out.filename.ends_with(".jpg"));
        let bytes = fs::read(writer.dir().join(&out.filename)).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert!(!image::load_from_memory(&bytes).unwrap().color().has_alpha());
    }

    #[test]
    fn export_uppercase_hint_is_accepted() {
        let (_tmp, writer) = writer();
        let out = writer
            .export(&solid_rgba(2, 2, [9, 9, 9, 255]), "JPEG", Quality::default())
            .unwrap();
        assert!(out.filename.ends_with(".JPEG"));
    }

    #[test]
    fn exports_in_same_second_do_not_overwrite() {
        let (_tmp, writer) = writer();
        let img = solid_rgba(1, 1, [0, 0, 0, 255]);
        let a = writer.export_at(&img, "png", Quality::default(), at(1, 1, 1)).unwrap();
        let b = writer.export_at(&img, "png", Quality::default(), at(1, 1, 1)).unwrap();

        assert_ne!(a.filename, b.filename);
        assert_eq!(b.export_id, "export_20240102_010101_2");
    }

    #[test]
    fn unsupported_format_writes_nothing() {
        let (_tmp, writer) = writer();
        let err = writer
            .export(&solid_rgba(1, 1, [0, 0, 0, 255]), "xyz", Quality::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Codec);
        assert_eq!(fs::read_dir(writer.dir()).unwrap().count(), 0);
    }
}
