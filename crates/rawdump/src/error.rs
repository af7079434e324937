use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DumpError>;

/// Coarse classification of [`DumpError`].
///
/// Every class is fatal; the class only decides how a failure is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad command-line input, bad magic, wrong file type, offsets out of range.
    Validation,
    /// Read/write/seek/stat/sync failures, including truncated streams.
    Io,
    /// Allocation failures.
    Resource,
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("can't stat \"{}\": {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("\"{}\" open failed: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("can't get size of the block device \"{}\": {source}", path.display())]
    DeviceSize { path: PathBuf, source: io::Error },

    #[error("out of memory allocating {len} bytes")]
    OutOfMemory { len: usize },

    #[error("bad magic {found:#018x}")]
    InvalidMagic { found: u64 },

    #[error("unexpected end of input ({0})")]
    UnexpectedEof(&'static str),

    #[error("truncated input: expected {expected} bytes, got {read}")]
    ShortRead { expected: usize, read: usize },

    #[error("write accepted zero bytes")]
    WriteZero,

    #[error("invalid offset {0:?}")]
    InvalidOffset(String),

    #[error("invalid stump spec {0:?}, must be <offset>:<string>")]
    InvalidStump(String),

    #[error("bad offset: offset={offset} length={length}")]
    BadOffset { offset: u64, length: u64 },

    #[error("\"{}\" is not regular file or device node", path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("destination \"{}\" already exists", path.display())]
    DestinationExists { path: PathBuf },

    #[error("cowardly declining the creation of empty dump")]
    EmptySource,

    #[error("cowardly declining the creation of dump of {size} bytes (limit {max_mib} MiB)")]
    SourceTooLarge { size: u64, max_mib: u64 },

    #[error("offset ({offset}) is beyond the size of the source file ({size})")]
    OffsetBeyondSource { offset: u64, size: u64 },

    #[error("peek length {len} exceeds the maximum of {max}")]
    PeekTooLong { len: u64, max: u64 },

    #[error("peeked data is not terminated")]
    Unterminated,

    #[error("destination sync failed: {0}")]
    Sync(#[source] io::Error),

    #[error("reboot failed: {0}")]
    RebootFailed(#[source] io::Error),
}

impl DumpError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_)
            | Self::Stat { .. }
            | Self::Open { .. }
            | Self::DeviceSize { .. }
            | Self::UnexpectedEof(_)
            | Self::ShortRead { .. }
            | Self::WriteZero
            | Self::Sync(_)
            | Self::RebootFailed(_) => ErrorClass::Io,
            Self::OutOfMemory { .. } => ErrorClass::Resource,
            Self::InvalidMagic { .. }
            | Self::InvalidOffset(_)
            | Self::InvalidStump(_)
            | Self::BadOffset { .. }
            | Self::UnsupportedFileType { .. }
            | Self::DestinationExists { .. }
            | Self::EmptySource
            | Self::SourceTooLarge { .. }
            | Self::OffsetBeyondSource { .. }
            | Self::PeekTooLong { .. }
            | Self::Unterminated => ErrorClass::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_an_io_error() {
        let err = DumpError::ShortRead {
            expected: 16,
            read: 3,
        };
        assert_eq!(err.class(), ErrorClass::Io);
        assert_eq!(DumpError::UnexpectedEof("header").class(), ErrorClass::Io);
    }

    #[test]
    fn format_problems_are_validation_errors() {
        assert_eq!(
            DumpError::InvalidMagic { found: 0 }.class(),
            ErrorClass::Validation
        );
        assert_eq!(
            DumpError::InvalidStump("x".into()).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            DumpError::OutOfMemory { len: 1 }.class(),
            ErrorClass::Resource
        );
    }

    #[test]
    fn magic_is_rendered_in_hex() {
        let msg = DumpError::InvalidMagic { found: 0x1234 }.to_string();
        assert_eq!(msg, "bad magic 0x0000000000001234");
    }
}
