//! Error taxonomy shared by every layer.
//!
//! Each module keeps its own `thiserror` enum (`StoreError`, `ImagingError`,
//! `ExportError`) and classifies its variants into one of a handful of kinds. The HTTP
//! surface only ever looks at the kind to pick a status code; the message it
//! returns to the client is the error's `Display`.

use axum::http::StatusCode;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A project or export id that does not exist.
    NotFound,
    /// Missing request field, bad data URL, bad base64, unrecognized image bytes.
    MalformedInput,
    /// Filesystem failure on read, write, delete or enumerate.
    Storage,
    /// Unsupported output format or an encoder/decoder failure.
    Codec,
    /// Request body above the configured size limit.
    PayloadTooLarge,
    /// A worker task panicked or was cancelled.
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Storage | ErrorKind::Codec | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::MalformedInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorKind::Storage.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorKind::Codec.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ErrorKind::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorKind::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
