//! Error types for JoyBuild.
//!
//! Library crates use [`JoyBuildError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-asset build failures are not errors: a collaborator that fails to
//! build one asset produces a failed `BuildResult`.

use std::path::PathBuf;

use crate::types::AssetKind;

/// Top-level error type for all JoyBuild operations.
#[derive(Debug, thiserror::Error)]
pub enum JoyBuildError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A directory could not be read while walking the asset tree.
    #[error("cannot scan {path:?}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The persisted content database is missing or malformed.
    #[error("cannot load content database {path:?}: {message}")]
    DatabaseLoad { path: PathBuf, message: String },

    /// A node of this kind reached a code path that only handles buildable kinds.
    #[error("internal error: asset kind {kind} cannot be dispatched ({path:?})")]
    UnknownAssetKind { kind: AssetKind, path: PathBuf },

    /// A builder collaborator could not be brought up for a batch.
    #[error("builder error: {0}")]
    Builder(String),

    /// Data validation error (bad relative path, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, JoyBuildError>;

impl JoyBuildError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a directory listing failure hit during a tree walk.
    pub fn scan(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Scan {
            path: path.into(),
            source,
        }
    }

    /// Create a database load error from any displayable message.
    pub fn database_load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::DatabaseLoad {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Whether this error is a structural precondition failure that aborts a
    /// whole operation (as opposed to a programming fault).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Scan { .. } | Self::DatabaseLoad { .. } | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = JoyBuildError::config("missing data root");
        assert_eq!(err.to_string(), "config error: missing data root");

        let err = JoyBuildError::database_load("JoyData/data.db", "expected value at line 1");
        assert!(err.to_string().contains("data.db"));
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn unknown_kind_names_the_kind() {
        let err = JoyBuildError::UnknownAssetKind {
            kind: AssetKind::Folder,
            path: PathBuf::from("JoyData/models"),
        };
        assert!(err.to_string().contains("Folder"));
        assert!(!err.is_precondition());
    }

    #[test]
    fn scan_and_database_errors_are_preconditions() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(JoyBuildError::scan("JoyData", io).is_precondition());
        assert!(JoyBuildError::database_load("data.db", "missing").is_precondition());
    }
}
