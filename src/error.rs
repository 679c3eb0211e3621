//! Failure taxonomy for the codec.
//!
//! Every error here is fatal for the stream it occurred on: compression and
//! decompression of a single stream are all-or-nothing, and nothing is
//! retried internally. The variants are kept distinct so callers can tell
//! "not a bzip2 file" from "checksum failed" from "truncated file".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BzError {
    /// The stream does not start with `"BZh"` plus a block-size digit 1-9.
    #[error("not a bzip2 stream (bad magic or block size digit)")]
    InvalidHeader,

    /// A block boundary carried neither the block magic nor the end-of-stream
    /// magic. The stream is treated as corrupt, not as cleanly ended.
    #[error("invalid block header magic")]
    InvalidBlockHeader,

    /// A per-block or whole-stream CRC failed. The data is corrupt.
    #[error("crc mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },

    /// The input ran out in the middle of a field.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,

    /// A structural invariant of the sort or coding stages was violated.
    #[error("internal consistency failure: {0}")]
    InternalConsistency(&'static str),

    #[error(transparent)]
    Io(std::io::Error),
}

impl From<BzError> for std::io::Error {
    fn from(e: BzError) -> Self {
        match e {
            BzError::Io(io) => io,
            BzError::UnexpectedEndOfStream => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e)
            }
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

impl From<std::io::Error> for BzError {
    fn from(e: std::io::Error) -> Self {
        // One of our own errors that crossed the io::Error boundary through
        // the Read/Write impls comes back out as the original variant, so
        // callers can still tell a bad header from a bad checksum.
        match e.downcast::<BzError>() {
            Ok(original) => original,
            Err(e) => BzError::Io(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn variants_survive_the_io_error_boundary() {
        let io: std::io::Error = BzError::InvalidHeader.into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
        assert!(matches!(BzError::from(io), BzError::InvalidHeader));

        let io: std::io::Error = BzError::CrcMismatch {
            stored: 1,
            computed: 2,
        }
        .into();
        assert!(matches!(
            BzError::from(io),
            BzError::CrcMismatch {
                stored: 1,
                computed: 2
            }
        ));

        let io: std::io::Error = BzError::UnexpectedEndOfStream.into();
        assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);
        assert!(matches!(BzError::from(io), BzError::UnexpectedEndOfStream));
    }

    #[test]
    fn foreign_io_errors_stay_io() {
        let plain = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(BzError::from(plain), BzError::Io(_)));
    }
}
