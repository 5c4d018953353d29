//! Error types for kvlite.

use std::fmt;

/// The main error type for kvlite operations.
#[derive(Debug)]
pub enum Error {
    /// Bad caller input (empty key, invalid pattern, zero limit, unencodable value)
    Validation(String),

    /// Stored bytes could not be decoded into a value
    Decode(String),

    /// The storage engine reported a failure
    Backend(String),

    /// The store or backend has been closed
    Closed,

    /// I/O error
    Io(std::io::Error),

    /// A backup image failed its integrity check
    Corruption(String),
}

/// Coarse classification of an [`Error`].
///
/// Every error belongs to exactly one of these three kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed input the store refuses to act on
    Validation,
    /// Stored data is corrupt or in a foreign format
    Decode,
    /// The storage engine is unavailable, closed, or failed
    Backend,
}

impl Error {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Backend(_) | Error::Closed | Error::Io(_) | Error::Corruption(_) => {
                ErrorKind::Backend
            }
        }
    }

    /// Shorthand for building a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Shorthand for building a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::Decode(msg) => write!(f, "Decode error: {}", msg),
            Error::Backend(msg) => write!(f, "Backend error: {}", msg),
            Error::Closed => write!(f, "Backend error: store is closed"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Corruption(msg) => write!(f, "Corruption: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for kvlite operations.
pub type Result<T> = std::result::Result<T, Error>;
