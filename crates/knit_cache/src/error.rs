//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Reads never surface these: they degrade to cache misses. Writes propagate
/// them because a failed commit must abort the build.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A header record does not follow the record layout.
    #[error("malformed header record: {reason}")]
    MalformedRecord {
        /// Description of the decoding failure.
        reason: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CacheError::MalformedRecord {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::io(
            "/tmp/cache/app/module.header",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("module.header"));
    }

    #[test]
    fn malformed_record_display() {
        let err = CacheError::malformed("unexpected end of record");
        assert_eq!(
            err.to_string(),
            "malformed header record: unexpected end of record"
        );
    }

    #[test]
    fn serialization_error_display() {
        let err = CacheError::Serialization {
            reason: "invalid json".to_string(),
        };
        assert!(err.to_string().contains("invalid json"));
    }
}
