//! Unified error handling for ddsforge
//!
//! Every failure a texture build can report is one of the variants below.
//! Callers that only care about the broad category use [`Error::kind`],
//! which looks through any context wrapping.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all ddsforge operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path
    #[error("I/O error on {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==================== Input Errors ====================

    /// Image dimensions are zero or do not fit the pixel data
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        width: u32,
        height: u32,
    },

    /// Pixel data length does not match the declared dimensions
    #[error("Pixel data size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        expected: usize,
        actual: usize,
    },

    /// Faces of an array or cube map disagree with each other
    #[error("Face {index} does not match the first face: {message}")]
    FaceMismatch {
        index: usize,
        message: String,
    },

    /// Cube maps need exactly six faces
    #[error("Cube map requires exactly 6 faces, got {count}")]
    CubeFaceCount {
        count: usize,
    },

    /// Generic invalid input
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    // ==================== Configuration Errors ====================

    /// Option combination that cannot be built
    #[error("Unsupported configuration: {message}")]
    UnsupportedConfiguration {
        message: String,
    },

    // ==================== Decode Errors ====================

    /// Source bytes could not be decoded into pixels
    #[error("Decode failed: {message}")]
    DecodeFailed {
        message: String,
    },

    /// Invalid magic bytes at file start
    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        found: Vec<u8>,
    },

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad dimensions, mismatched faces, wrong face count
    InvalidInput,
    /// Compression unavailable, conflicting options
    UnsupportedConfiguration,
    /// The decoder could not interpret the source bytes
    DecodeFailure,
    /// Read or write failure
    IoFailure,
    /// Broken internal invariant
    Internal,
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an unsupported configuration error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Error::DecodeFailed {
            message: message.into(),
        }
    }

    /// Attach a path to an I/O error
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Classify this error, looking through context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::IoAt { .. } => ErrorKind::IoFailure,
            Error::InvalidDimensions { .. }
            | Error::BufferSizeMismatch { .. }
            | Error::FaceMismatch { .. }
            | Error::CubeFaceCount { .. }
            | Error::InvalidInput { .. } => ErrorKind::InvalidInput,
            Error::UnsupportedConfiguration { .. } => ErrorKind::UnsupportedConfiguration,
            Error::DecodeFailed { .. } | Error::InvalidMagic { .. } | Error::InvalidData { .. } => {
                ErrorKind::DecodeFailure
            }
            Error::Internal { .. } => ErrorKind::Internal,
            Error::WithContext { source, .. } => source.kind(),
        }
    }

    /// Check if this is an input validation error
    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }

    /// Check if this is a configuration error
    pub fn is_unsupported_configuration(&self) -> bool {
        self.kind() == ErrorKind::UnsupportedConfiguration
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::InvalidDimensions { width: 0, height: 4 };
        let contextualized = err.with_context("while building face 2");

        assert!(contextualized.to_string().contains("while building face 2"));
        assert!(contextualized.to_string().contains("0x4"));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::CubeFaceCount { count: 5 }.kind(), ErrorKind::InvalidInput);
        assert_eq!(Error::unsupported("both swizzles").kind(), ErrorKind::UnsupportedConfiguration);
        assert_eq!(Error::decode("not an image").kind(), ErrorKind::DecodeFailure);
        assert_eq!(
            Error::io_at("/missing.png", std::io::Error::from(std::io::ErrorKind::NotFound)).kind(),
            ErrorKind::IoFailure
        );
        assert_eq!(
            Error::InvalidMagic { expected: b"DDS ".to_vec(), found: vec![0; 4] }.kind(),
            ErrorKind::DecodeFailure
        );
    }

    #[test]
    fn test_kind_sees_through_context() {
        let err = Error::CubeFaceCount { count: 3 }
            .with_context("outer")
            .with_context("outermost");

        assert!(err.is_invalid_input());
        assert!(!err.is_unsupported_configuration());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::internal("level out of order"));
        let with_context = result.context("assembling container");

        let err = with_context.unwrap_err();
        assert!(err.to_string().contains("assembling container"));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
