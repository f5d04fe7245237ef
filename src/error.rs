// src/error.rs
//! Error types for pool operations with conversion support

use std::io;
use thiserror::Error;

/// Errors that can occur while constructing or using a [`crate::Pool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// Capacity parameters rejected at construction
    #[error("invalid capacity settings: init_cap={init_cap}, max_cap={max_cap}")]
    InvalidCapacity {
        /// Requested number of eagerly created connections
        init_cap: isize,
        /// Requested idle-queue capacity
        max_cap: usize,
    },
    /// The factory failed while the constructor was filling the pool
    #[error("factory unable to fill pool")]
    Fill(#[source] io::Error),
    /// The pool has been shut down
    #[error("pool is closed")]
    Closed,
    /// An absent connection was handed back to the pool
    #[error("connection is nil")]
    NilConnection,
    /// The factory failed to create a connection; passed through unmodified
    #[error(transparent)]
    Factory(io::Error),
    /// Physically closing a connection failed
    #[error("failed to close connection: {0}")]
    Close(#[source] io::Error),
}

impl PoolError {
    /// Returns `true` if this error means the pool has been shut down.
    ///
    /// A closed pool never recovers; callers should discard it.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Convert PoolError to std::io::Error
impl From<PoolError> for io::Error {
    fn from(err: PoolError) -> Self {
        use io::ErrorKind;
        match err {
            PoolError::Factory(e) => e,
            other => {
                let kind = match &other {
                    PoolError::Fill(e) | PoolError::Close(e) => e.kind(),
                    PoolError::Closed => ErrorKind::NotConnected,
                    _ => ErrorKind::InvalidInput,
                };
                io::Error::new(kind, other)
            }
        }
    }
}

// ============================================================================
// RESULT TYPE ALIASES
// ============================================================================

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

// ============================================================================
// EXTENSION TRAIT FOR EASY CONVERSION
// ============================================================================

/// Extension trait for converting Results between different error types
pub trait ResultExt<T> {
    /// Convert to anyhow::Result
    #[cfg(feature = "anyhow")]
    fn into_anyhow(self) -> anyhow::Result<T>;

    /// Convert to io::Result
    fn into_io(self) -> io::Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    #[cfg(feature = "anyhow")]
    fn into_anyhow(self) -> anyhow::Result<T> {
        self.map_err(anyhow::Error::from)
    }

    fn into_io(self) -> io::Result<T> {
        self.map_err(|e| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_closed_maps_to_not_connected() {
        let io_err: io::Error = PoolError::Closed.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_factory_error_passes_through() {
        let err = PoolError::Factory(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(err.to_string(), "refused");

        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn test_fill_error_exposes_source() {
        let err = PoolError::Fill(io::Error::new(io::ErrorKind::TimedOut, "dial timeout"));
        assert_eq!(err.to_string(), "factory unable to fill pool");
        assert_eq!(err.source().unwrap().to_string(), "dial timeout");
    }

    #[test]
    fn test_result_ext() {
        let result: Result<u32> = Err(PoolError::NilConnection);
        let io_result = result.into_io();
        assert_eq!(io_result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(feature = "anyhow")]
    #[test]
    fn test_anyhow_conversion() {
        let result: Result<()> = Err(PoolError::Closed);
        let anyhow_err = result.into_anyhow().unwrap_err();
        assert!(anyhow_err.to_string().contains("pool is closed"));
    }
}
