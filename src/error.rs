//! Error taxonomy for store, codec and strategy operations

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for wallsaver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to facade callers. Nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// `path` names the first missing or mis-typed key (dotted), or the file
    #[error("parse error at `{path}`: {reason}")]
    ParseError { path: String, reason: String },

    #[error("failed to write {}: {reason}", path.display())]
    WriteError { path: PathBuf, reason: String },

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("screensaver not found: {0}")]
    ScreensaverNotFound(String),

    #[error("space not found: {0}")]
    SpaceNotFound(String),

    #[error("display not found: {0}")]
    DisplayNotFound(String),

    #[error("space {space} not found on display {display}")]
    SpaceNotFoundOnDisplay { display: String, space: String },

    #[error("per-display and per-space settings require macOS 14 (Sonoma) or later")]
    ModernFeatureRequired,

    #[error("invalid screen identifier: {0}")]
    InvalidScreenIdentifier(u32),

    #[error("failed to detect system version: {0}")]
    SystemVersionDetectionFailed(String),

    #[error("unexpected error: {0}")]
    UnknownError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ParseError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Map an I/O failure on the read side
    pub(crate) fn from_read(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_path_buf()),
            _ => Error::UnknownError(Box::new(err)),
        }
    }

    /// Map an I/O failure on the write side
    pub(crate) fn from_write(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_path_buf()),
            _ => Error::WriteError {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_errors_map_by_kind() {
        let path = Path::new("/tmp/Index.plist");
        let err = Error::from_read(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::NotFound(p) if p == path));

        let err = Error::from_read(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err = Error::from_read(path, io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(err, Error::UnknownError(_)));
    }

    #[test]
    fn test_write_errors_map_by_kind() {
        let path = Path::new("/tmp/Index.plist");
        let err = Error::from_write(path, io::Error::from(io::ErrorKind::StorageFull));
        assert!(matches!(err, Error::WriteError { .. }));

        let err = Error::from_write(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_parse_error_names_key_path() {
        let err = Error::parse("Spaces.ABC.Displays", "expected mapping, found string");
        assert_eq!(
            err.to_string(),
            "parse error at `Spaces.ABC.Displays`: expected mapping, found string"
        );
    }
}
