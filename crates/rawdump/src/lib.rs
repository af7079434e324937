//! Raw block-device snapshots.
//!
//! A dump is a byte stream holding a magic number followed by `(offset, length, payload)`
//! records and a `(0, 0)` terminator. This crate provides:
//!
//! - [`write_dump`] / [`create_to_path`]: serialize a file or device, last block first
//! - [`install_dump`] / [`install_to_path`]: replay a dump onto an existing file or device
//! - [`parse_offset`] / [`parse_stump`]: strict parsing of command-line offsets and stumps
//! - [`peek_string`]: read a NUL-terminated string at an offset
//! - [`ReadBoundedExt`] / [`WriteBoundedExt`]: exact-length I/O with a per-call size cap
//!
//! OS specifics (block device sizes, rebooting) are behind the [`Platform`] trait.

mod create;
mod error;
mod format;
mod install;
mod io;
mod parse;
mod peek;
mod platform;
mod progress;

pub use create::{
    check_source_size, create_to_path, plan_blocks, write_dump, BlockPlan, CreateOptions,
};
pub use error::{DumpError, ErrorClass, Result};
pub use format::{
    decode_u64, encode_u64, RecordHeader, BLOCK_LEN, CHUNK_LEN, DUMP_MAGIC, HEADER_LEN,
    MAX_OFFSET, MAX_READ_SIZE, MAX_SOURCE_MIB, MAX_WRITE_SIZE, MIB,
};
pub use install::{
    apply_stumps, install_blocks, install_dump, install_to_path, read_magic, Destination,
    InstallOptions, REBOOT_DELAY,
};
pub use io::{staging_buffer, stream_exact, Fill, ReadBoundedExt, WriteBoundedExt};
pub use parse::{parse_offset, parse_stump, Stump, Stumps};
pub use peek::{peek_path, peek_string, PEEK_DEFAULT_LEN, PEEK_MAX_LEN};
pub use platform::{source_size, FileKind, Platform};
pub use progress::{BlockEvent, Phase, Progress, TransferSummary};

#[cfg(test)]
mod proptests;
