//! Identifier generation for stored projects and exported images.
//!
//! Every file the server writes is named after the wall-clock second it was
//! created in:
//!
//! - `project_20240102_030405` → `projects/project_20240102_030405.json`
//! - `export_20240102_030405` → `exports/export_20240102_030405.png`
//!
//! Two writes in the same second would produce the same name. Instead of
//! letting the second one overwrite the first, [`write_unique`] creates files
//! with `create_new` and appends a numeric suffix on collision:
//! `project_20240102_030405_2`, `_3`, and so on.

use chrono::NaiveDateTime;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Upper bound on collision suffixes tried for a single stem.
const MAX_ATTEMPTS: u32 = 10_000;

/// Build a `<prefix>_<YYYYMMDD_HHMMSS>` identifier.
///
/// ```
/// # use chrono::NaiveDate;
/// # use drawpro_server::naming::timestamp_id;
/// let now = NaiveDate::from_ymd_opt(2024, 1, 2)
///     .unwrap()
///     .and_hms_opt(3, 4, 5)
///     .unwrap();
/// assert_eq!(timestamp_id("project", now), "project_20240102_030405");
/// ```
pub fn timestamp_id(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// The candidate id for a given attempt: the stem itself first, then `stem_2`, `stem_3`, ...
fn candidate(stem: &str, attempt: u32) -> String {
    if attempt <= 1 {
        stem.to_string()
    } else {
        format!("{}_{}", stem, attempt)
    }
}

/// Write `contents` to `<dir>/<id>.<ext>` under the first free id derived from `stem`.
///
/// Returns the id that was used. The existence check and the creation are a
/// single `create_new` open, so concurrent callers racing on the same stem each
/// end up with their own file.
pub fn write_unique(dir: &Path, stem: &str, ext: &str, contents: &[u8]) -> io::Result<String> {
    for attempt in 1..=MAX_ATTEMPTS {
        let id = candidate(stem, attempt);
        let path = dir.join(format!("{}.{}", id, ext));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };
        if let Err(e) = file.write_all(contents).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        return Ok(id);
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {} in {}", stem, dir.display()),
    ))
}

/// Whether `id` is safe to join onto a storage directory.
///
/// Ids come straight from URL path segments, but a project file dropped in by
/// hand can be named anything. Only what could escape the directory is
/// refused: empty ids, path separators, and a leading dot (`.`, `..`, hidden
/// files).
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && !id.starts_with('.') && !id.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::at;
    use tempfile::TempDir;

    #[test]
    fn timestamp_id_is_zero_padded() {
        assert_eq!(timestamp_id("export", at(3, 4, 5)), "export_20240102_030405");
        assert_eq!(timestamp_id("project", at(23, 59, 0)), "project_20240102_235900");
    }

    #[test]
    fn candidate_suffixes_after_first_attempt() {
        assert_eq!(candidate("project_x", 1), "project_x");
        assert_eq!(candidate("project_x", 2), "project_x_2");
        assert_eq!(candidate("project_x", 10), "project_x_10");
    }

    #[test]
    fn write_unique_uses_stem_when_free() {
        let tmp = TempDir::new().unwrap();
        let id = write_unique(tmp.path(), "project_a", "json", b"{}").unwrap();
        assert_eq!(id, "project_a");
        assert_eq!(
            std::fs::read(tmp.path().join("project_a.json")).unwrap(),
            b"{}"
        );
    }

    #[test]
    fn write_unique_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let first = write_unique(tmp.path(), "export_a", "png", b"one").unwrap();
        let second = write_unique(tmp.path(), "export_a", "png", b"two").unwrap();
        let third = write_unique(tmp.path(), "export_a", "png", b"three").unwrap();

        assert_eq!(first, "export_a");
        assert_eq!(second, "export_a_2");
        assert_eq!(third, "export_a_3");
        assert_eq!(std::fs::read(tmp.path().join("export_a.png")).unwrap(), b"one");
        assert_eq!(std::fs::read(tmp.path().join("export_a_2.png")).unwrap(), b"two");
    }

    #[test]
    fn write_unique_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(write_unique(&missing, "project_a", "json", b"{}").is_err());
    }

    #[test]
    fn safe_ids() {
        assert!(is_safe_id("project_20240102_030405"));
        assert!(is_safe_id("project_20240102_030405_2"));
        assert!(is_safe_id("my-drawing.v2"));
        assert!(is_safe_id("My Sketch"));
        assert!(is_safe_id("esquisse d'été (2)"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id(".."));
        assert!(!is_safe_id(".hidden"));
        assert!(!is_safe_id("../etc/passwd"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a\\b"));
        assert!(!is_safe_id("a\0b"));
    }
}
