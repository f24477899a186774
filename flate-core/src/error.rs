//! Error and status types.
//!
//! Two distinct vocabularies are used here, mirroring the split zlib itself
//! makes: [`FlateError`] covers misuse at construction time (an invalid
//! window size passed to `new`, for instance) and is a normal `std::error::Error`.
//! [`Status`] covers the outcome of a single `process()` call and is returned
//! by value alongside byte counts, the same way zlib returns an `int` from
//! every call to `deflate()`/`inflate()` rather than a `Result`.

use thiserror::Error;

/// Construction-time misuse of the compressor/decompressor builders.
#[derive(Debug, Error)]
pub enum FlateError {
    /// `window_bits` outside the supported range (9..=15).
    #[error("invalid window_bits: {bits} (must be 9..=15)")]
    InvalidWindowBits {
        /// The out-of-range value supplied.
        bits: u8,
    },

    /// `memory_level` outside the supported range (1..=9).
    #[error("invalid memory_level: {level} (must be 1..=9)")]
    InvalidMemoryLevel {
        /// The out-of-range value supplied.
        level: u8,
    },

    /// Compression level outside the supported range (0..=9).
    #[error("invalid compression level: {level} (must be 0..=9)")]
    InvalidLevel {
        /// The out-of-range value supplied.
        level: u8,
    },

    /// A preset dictionary was supplied after the stream had already produced output.
    #[error("preset dictionary set too late: {message}")]
    DictionaryTooLate {
        /// Detail of why the dictionary call was rejected.
        message: String,
    },
}

/// Result type alias for construction-time fallible operations.
pub type Result<T> = std::result::Result<T, FlateError>;

/// Outcome of a single `process()` call, mirroring zlib's integer return codes.
///
/// Unlike [`FlateError`], a non-`Ok` `Status` is not necessarily a failure of
/// the Rust API: `BufError` just means "call again with more input or output
/// space", and `StreamEnd` means the stream finished successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Progress was made; call again to continue.
    Ok,
    /// The stream reached its logical end (final block consumed/emitted and,
    /// for framed streams, the trailer checksum verified).
    StreamEnd,
    /// A preset dictionary is required before decoding can continue; the
    /// caller should call `set_dictionary` and retry.
    NeedDict,
    /// No progress was possible: both input and output space were exhausted
    /// without consuming/producing a single byte. Not a corruption signal.
    BufError,
    /// The compressed stream is malformed: bad header, illegal Huffman code,
    /// out-of-range back-reference, checksum mismatch, and so on.
    DataError(String),
    /// The caller used the API incorrectly (e.g. called `process` after
    /// `StreamEnd`, or supplied a dictionary whose Adler-32 does not match
    /// what the stream recorded at `NeedDict` time).
    StreamError(String),
    /// Internal bookkeeping invariant violated; should not occur in a
    /// correctly constructed stream, analogous to zlib's `Z_MEM_ERROR` used
    /// defensively outside raw allocation failures.
    MemError,
    /// Reserved for forward compatibility with future container/version tags.
    VersionError,
}

impl Status {
    /// True for `Ok` and `StreamEnd`: call succeeded and consumed/produced data.
    pub fn is_progress(&self) -> bool {
        matches!(self, Status::Ok | Status::StreamEnd)
    }

    /// True once the stream is logically finished.
    pub fn is_done(&self) -> bool {
        matches!(self, Status::StreamEnd)
    }

    /// True for any of the error variants.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Status::DataError(_) | Status::StreamError(_) | Status::MemError | Status::VersionError
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(Status::Ok.is_progress());
        assert!(Status::StreamEnd.is_progress());
        assert!(Status::StreamEnd.is_done());
        assert!(!Status::BufError.is_progress());
        assert!(Status::DataError("bad".into()).is_error());
        assert!(!Status::NeedDict.is_error());
    }

    #[test]
    fn test_invalid_window_bits_message() {
        let err = FlateError::InvalidWindowBits { bits: 20 };
        assert!(err.to_string().contains("20"));
    }
}
