use std::io;

use num_derive::FromPrimitive;
use tracing::error;

/// Errors that can occur while sizing, encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// A required input was empty.
    #[error("null argument")]
    NullArgument,
    /// An array reports a non-zero count but has no backing storage.
    #[error("field `{field}` has count {count} but no data")]
    NullWithCount {
        /// Field name
        field: &'static str,
        /// Count reported by the record
        count: u32,
    },
    /// An array reports more elements than its backing storage holds.
    #[error("field `{field}` has count {count} but only {len} elements")]
    CountOverflow {
        /// Field name
        field: &'static str,
        /// Count reported by the record
        count: u32,
        /// Elements actually present
        len: usize,
    },
    /// An allocation could not be satisfied.
    #[error("allocation of {bytes} bytes failed")]
    AllocationFailed {
        /// Requested size
        bytes: usize,
    },
    /// The source delivered fewer bytes than required.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes required
        expected: usize,
        /// Bytes transferred
        actual: usize,
    },
    /// The sink accepted fewer bytes than required.
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        /// Bytes required
        expected: usize,
        /// Bytes transferred
        actual: usize,
    },
    /// The frame does not start with the front signature.
    #[error("front signature mismatch: {0:#018x}")]
    FrontSignatureMismatch(u64),
    /// The frame does not end with the back signature.
    #[error("back signature mismatch: {0:#018x}")]
    BackSignatureMismatch(u64),
    /// The cursor did not land on the frame length.
    #[error("misalignment: expected {expected} bytes, cursor at {actual}")]
    Misalignment {
        /// Length the frame should have
        expected: usize,
        /// Bytes actually produced or consumed
        actual: usize,
    },
    /// The input is shorter than the frame requires.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes the frame requires
        needed: usize,
        /// Bytes available
        available: usize,
    },
    /// A type tag with no meaning in this position.
    #[error("unknown type: {0}")]
    UnknownType(u8),
    /// A record accessor produced a value of the wrong type.
    #[error("field `{field}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field name
        field: &'static str,
        /// Type named by the descriptor
        expected: crate::TypeTag,
        /// Type produced by the accessor
        actual: crate::TypeTag,
    },
    /// A string cannot be zero terminated because it contains a zero byte.
    #[error("field `{field}` contains an interior nul byte")]
    InteriorNul {
        /// Field name
        field: &'static str,
    },
    /// A decoded string is not valid UTF-8.
    #[error("field `{field}` is not valid utf-8: {source}")]
    InvalidUtf8 {
        /// Field name
        field: &'static str,
        /// Underlying error
        #[source]
        source: std::str::Utf8Error,
    },
    /// The frame length does not fit the 4-byte length field.
    #[error("frame of {0} bytes exceeds the 4-byte length field")]
    FrameTooLarge(usize),
    /// An I/O error from a file adapter or stream.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Stable numeric result code for each [`PersistError`] kind.
///
/// Codes 0 to 6 are fixed by the format; later kinds are appended.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    /// No error
    Success = 0,
    /// See [`PersistError::AllocationFailed`]
    AllocationFailed = 1,
    /// See [`PersistError::ShortRead`]
    ShortRead = 2,
    /// See [`PersistError::ShortWrite`]
    ShortWrite = 3,
    /// See [`PersistError::FrontSignatureMismatch`]
    FrontSignatureMismatch = 4,
    /// See [`PersistError::BackSignatureMismatch`]
    BackSignatureMismatch = 5,
    /// See [`PersistError::UnknownType`]
    UnknownType = 6,
    /// See [`PersistError::NullArgument`]
    NullArgument = 7,
    /// See [`PersistError::NullWithCount`]
    NullWithCount = 8,
    /// See [`PersistError::Misalignment`]
    Misalignment = 9,
    /// See [`PersistError::BufferTooSmall`]
    BufferTooSmall = 10,
    /// See [`PersistError::CountOverflow`]
    CountOverflow = 11,
    /// See [`PersistError::TypeMismatch`]
    TypeMismatch = 12,
    /// See [`PersistError::InteriorNul`]
    InteriorNul = 13,
    /// See [`PersistError::InvalidUtf8`]
    InvalidUtf8 = 14,
    /// See [`PersistError::FrameTooLarge`]
    FrameTooLarge = 15,
    /// See [`PersistError::Io`]
    Io = 16,
}

impl PersistError {
    /// The result code for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NullArgument => ErrorCode::NullArgument,
            Self::NullWithCount { .. } => ErrorCode::NullWithCount,
            Self::CountOverflow { .. } => ErrorCode::CountOverflow,
            Self::AllocationFailed { .. } => ErrorCode::AllocationFailed,
            Self::ShortRead { .. } => ErrorCode::ShortRead,
            Self::ShortWrite { .. } => ErrorCode::ShortWrite,
            Self::FrontSignatureMismatch(_) => ErrorCode::FrontSignatureMismatch,
            Self::BackSignatureMismatch(_) => ErrorCode::BackSignatureMismatch,
            Self::Misalignment { .. } => ErrorCode::Misalignment,
            Self::BufferTooSmall { .. } => ErrorCode::BufferTooSmall,
            Self::UnknownType(_) => ErrorCode::UnknownType,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::InteriorNul { .. } => ErrorCode::InteriorNul,
            Self::InvalidUtf8 { .. } => ErrorCode::InvalidUtf8,
            Self::FrameTooLarge(_) => ErrorCode::FrameTooLarge,
            Self::Io(_) => ErrorCode::Io,
        }
    }
}

/// Diagnostic message for a result code.
pub const fn describe_error(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::Success => "Persist: success",
        ErrorCode::AllocationFailed => "Persist error: memory allocation failed!",
        ErrorCode::ShortRead => "Persist error: failed to read the whole frame!",
        ErrorCode::ShortWrite => "Persist error: failed to write the whole frame!",
        ErrorCode::FrontSignatureMismatch => "Persist error: front signature mismatch!",
        ErrorCode::BackSignatureMismatch => "Persist error: back signature mismatch!",
        ErrorCode::UnknownType => "Persist error: unknown type encountered!",
        ErrorCode::NullArgument => "Persist error: null argument!",
        ErrorCode::NullWithCount => "Persist error: array has a count but no data!",
        ErrorCode::Misalignment => "Persist error: frame length does not match its contents!",
        ErrorCode::BufferTooSmall => "Persist error: buffer is smaller than the frame!",
        ErrorCode::CountOverflow => "Persist error: array count exceeds its data!",
        ErrorCode::TypeMismatch => "Persist error: field value does not match its type!",
        ErrorCode::InteriorNul => "Persist error: string contains a nul byte!",
        ErrorCode::InvalidUtf8 => "Persist error: string is not valid utf-8!",
        ErrorCode::FrameTooLarge => "Persist error: frame is too large!",
        ErrorCode::Io => "Persist error: i/o failure!",
    }
}

/// Emit the diagnostic for `err` on the `tracing` error stream.
pub fn report_error(err: &PersistError) {
    let code = err.code();
    error!(code = code as u8, "{} ({err})", describe_error(code));
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use num_traits::FromPrimitive;

    use super::*;
    use crate::TypeTag;

    #[test]
    fn test_error_display() {
        let cases = [
            (PersistError::NullArgument, "null argument"),
            (
                PersistError::NullWithCount {
                    field: "scores",
                    count: 3,
                },
                "field `scores` has count 3 but no data",
            ),
            (
                PersistError::FrontSignatureMismatch(0xDEAD_BEEF_CAFE_BABF),
                "front signature mismatch: 0xdeadbeefcafebabf",
            ),
            (
                PersistError::BufferTooSmall {
                    needed: 40,
                    available: 12,
                },
                "buffer too small: need 40 bytes, have 12",
            ),
            (
                PersistError::TypeMismatch {
                    field: "id",
                    expected: TypeTag::I32,
                    actual: TypeTag::U8,
                },
                "field `id`: expected i32, got u8",
            ),
            (PersistError::UnknownType(42), "unknown type: 42"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_codes_are_distinct_and_described() {
        let mut seen = std::collections::HashSet::new();
        for raw in 0..=16u8 {
            let code = ErrorCode::from_u8(raw).unwrap();
            assert_eq!(code as u8, raw);
            assert!(describe_error(code).starts_with("Persist"));
            assert!(seen.insert(describe_error(code)));
        }
        assert!(ErrorCode::from_u8(17).is_none());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PersistError::BackSignatureMismatch(0).code(),
            ErrorCode::BackSignatureMismatch
        );
        assert_eq!(
            PersistError::Misalignment {
                expected: 1,
                actual: 2
            }
            .code(),
            ErrorCode::Misalignment
        );
        let io = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(PersistError::from(io).code(), ErrorCode::Io);
        assert_eq!(
            describe_error(ErrorCode::FrontSignatureMismatch),
            "Persist error: front signature mismatch!"
        );
    }

    #[test]
    fn test_report_error() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        report_error(&PersistError::BufferTooSmall {
            needed: 20,
            available: 3,
        });
        report_error(&PersistError::UnknownType(200));
    }
}
