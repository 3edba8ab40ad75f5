//! Custom error types for the cidscan risk engine.
//!
//! Provides a structured error hierarchy for better error handling
//! and more informative error messages.

use std::path::PathBuf;

/// The main error type for cidscan operations.
#[derive(Debug, thiserror::Error)]
pub enum CidScanError {
    /// Referenced entity (asset, risk, treatment, residual) absent from the store
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Out-of-range or malformed input value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Asset type with no entry in the CID weight table
    #[error("unknown asset type '{0}'")]
    UnknownAssetType(String),

    /// Unparseable scan target specification
    #[error("invalid scan target '{spec}': {reason}")]
    InvalidTarget { spec: String, reason: String },

    /// Regex compilation error
    #[error("Invalid regex pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// I/O error (file read/write, permissions, etc.)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error from the record store
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Result type alias using CidScanError
pub type CidScanResult<T> = Result<T, CidScanError>;

impl CidScanError {
    /// Create a NotFound error for a store entity
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an InvalidInput error from any message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an InvalidTarget error with context
    pub fn target(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create a regex error with pattern context
    pub fn regex(source: regex::Error, pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for CidScanError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = CidScanError::not_found("risk", 42);
        assert_eq!(err.to_string(), "risk 42 not found");
    }

    #[test]
    fn test_unknown_asset_type_display() {
        let err = CidScanError::UnknownAssetType("Drone".to_string());
        assert!(err.to_string().contains("Drone"));
    }

    #[test]
    fn test_io_error_display() {
        let err = CidScanError::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            Some(PathBuf::from("/test/path")),
        );
        assert!(err.to_string().contains("/test/path"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CidScanError = io_err.into();
        matches!(err, CidScanError::Io { .. });
    }
}
