//! Error types for the StormReplay decoder.
//!
//! This module defines the error hierarchy for every failure case in the
//! decoding pipeline: opening the archive, resolving a protocol for the
//! replay's base build, reading named sub-streams, and decoding their
//! wire data.

use thiserror::Error;

/// The main error type for replay decoding operations.
///
/// The variants map onto the phases of the pipeline:
/// - Archive access failures (`Io`, `ArchiveOpen`, `MissingSubstream`)
/// - Protocol selection failures (`UnsupportedProtocol`)
/// - Wire decoding failures (`ProtocolDecode`, `UnexpectedEof`)
/// - Session lifecycle violations (`SessionClosed`)
///
/// # Example
///
/// ```
/// use stormreplay::error::{ReplayError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(ReplayError::UnsupportedProtocol { base_build: 12345 })
/// }
/// ```
#[derive(Error, Debug)]
pub enum ReplayError {
    /// An I/O error occurred while reading archive data.
    ///
    /// This wraps standard library I/O errors for seamless error propagation
    /// using the `?` operator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The replay archive could not be opened.
    ///
    /// Raised at session creation for malformed or unreadable input;
    /// no partial session is ever returned.
    #[error("Failed to open replay archive: {reason}")]
    ArchiveOpen {
        /// A description of what made the archive unreadable.
        reason: String,
    },

    /// The replay's base build has no registered protocol decoder.
    ///
    /// Raised at session creation, after the header has been decoded but
    /// before any sub-stream load is attempted. Not recoverable; newer
    /// builds require a decoder release that knows their grammar.
    #[error("Unsupported base build: {base_build}")]
    UnsupportedProtocol {
        /// The base build number found in the replay header.
        base_build: u32,
    },

    /// A named sub-stream is absent from the archive.
    ///
    /// Fails only the specific load operation that requested the
    /// sub-stream; previously loaded fields are unaffected.
    #[error("Missing sub-stream: {name}")]
    MissingSubstream {
        /// The sub-stream name that was requested (e.g. `replay.details`).
        name: String,
    },

    /// Sub-stream bytes are malformed for the resolved protocol version.
    ///
    /// Fails only the specific load operation; the session remains usable.
    #[error("Protocol decode error: {reason}")]
    ProtocolDecode {
        /// A description of the decode failure.
        reason: String,
    },

    /// The wire data ended before the required bytes could be read.
    ///
    /// This typically indicates a truncated sub-stream. It is a
    /// decode-class failure kept separate for diagnostics.
    #[error("Unexpected end of data: expected {expected} bytes, but only {available} available")]
    UnexpectedEof {
        /// The number of bytes that were expected to be available.
        expected: usize,
        /// The actual number of bytes available.
        available: usize,
    },

    /// An operation was attempted on a closed session.
    #[error("Replay session is closed")]
    SessionClosed,
}

impl ReplayError {
    /// Creates a `ProtocolDecode` error from anything displayable.
    ///
    /// # Example
    ///
    /// ```
    /// use stormreplay::error::ReplayError;
    ///
    /// let err = ReplayError::decode("unknown tag 0x0B at offset 17");
    /// assert!(err.to_string().contains("unknown tag"));
    /// ```
    pub fn decode(reason: impl Into<String>) -> Self {
        ReplayError::ProtocolDecode {
            reason: reason.into(),
        }
    }

    /// Creates an `UnexpectedEof` error with the given sizes.
    ///
    /// # Arguments
    ///
    /// * `expected` - The number of bytes that were needed
    /// * `available` - The number of bytes actually available
    #[must_use]
    pub fn unexpected_eof(expected: usize, available: usize) -> Self {
        ReplayError::UnexpectedEof {
            expected,
            available,
        }
    }
}

/// A specialized Result type for replay decoding operations.
///
/// This is a convenience alias that uses `ReplayError` as the error type.
pub type Result<T> = std::result::Result<T, ReplayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplayError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));

        let err = ReplayError::ArchiveOpen {
            reason: "not a directory".to_string(),
        };
        assert!(err.to_string().contains("Failed to open replay archive"));

        let err = ReplayError::UnsupportedProtocol { base_build: 99999 };
        assert!(err.to_string().contains("99999"));

        let err = ReplayError::MissingSubstream {
            name: "replay.tracker.events".to_string(),
        };
        assert!(err.to_string().contains("replay.tracker.events"));

        let err = ReplayError::decode("bad tag");
        assert!(err.to_string().contains("bad tag"));

        let err = ReplayError::unexpected_eof(128, 64);
        assert!(err.to_string().contains("expected 128 bytes"));
        assert!(err.to_string().contains("64 available"));

        let err = ReplayError::SessionClosed;
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_unexpected_eof_helper() {
        let err = ReplayError::unexpected_eof(10, 3);
        match err {
            ReplayError::UnexpectedEof {
                expected,
                available,
            } => {
                assert_eq!(expected, 10);
                assert_eq!(available, 3);
            }
            _ => panic!("Expected UnexpectedEof variant"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        // Ensure the error type can be used across threads
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReplayError>();
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "test error");
        let replay_err: ReplayError = io_err.into();
        match replay_err {
            ReplayError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<u32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
