use thiserror::Error;

/// Main error type for coursetrack
#[derive(Error, Debug)]
pub enum CoursetrackError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Course root path missing or not a directory; fatal to a scan
    #[error("Invalid course path: {0}")]
    InvalidPath(String),

    /// Cached tree document cannot be reconstructed; forces a fresh scan
    #[error("Malformed cache document: {0}")]
    MalformedCacheDocument(String),

    /// An operation needed the current course but none is loaded
    #[error("No course is currently loaded")]
    CourseNotLoaded,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal errors (task join failures etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenient Result type using CoursetrackError
pub type Result<T> = std::result::Result<T, CoursetrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoursetrackError::InvalidPath("/no/such/dir".to_string());
        assert!(err.to_string().contains("Invalid course path"));
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: CoursetrackError = rusqlite_err.into();
        assert!(matches!(err, CoursetrackError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CoursetrackError = io_err.into();
        assert!(matches!(err, CoursetrackError::Io(_)));
    }
}
