//! On-disk layout of a dump stream.
//!
//! ```text
//! magic:u64
//! repeat { offset:u64 length:u64 payload[length] }   (blocks, last block first)
//! repeat { offset:u64 length:u64 string NUL }        (stumps, same record layout)
//! offset:u64 = 0 length:u64 = 0                      (terminator)
//! ```
//!
//! All integers are big-endian. Readers treat stump records like any other record.

/// First 8 bytes of every dump stream.
pub const DUMP_MAGIC: u64 = 0xfd54_522d_6475_6d70;

pub const MIB: u64 = 1024 * 1024;

/// Maximum length of one block record written by the dump writer.
pub const BLOCK_LEN: u64 = 128 * MIB;

/// Size of the staging buffer payloads are streamed through.
pub const CHUNK_LEN: usize = MIB as usize;

/// Per-call ceiling for a single `read`.
pub const MAX_READ_SIZE: usize = 64 * 1024;

/// Per-call ceiling for a single `write`.
pub const MAX_WRITE_SIZE: usize = 64 * 1024;

/// Sources with `size / MIB` above this are refused (1 TiB).
pub const MAX_SOURCE_MIB: u64 = MIB;

/// Largest offset a destination can be positioned at (signed 64-bit file offset).
pub const MAX_OFFSET: u64 = i64::MAX as u64;

pub const HEADER_LEN: usize = 16;

pub fn decode_u64(bytes: [u8; 8]) -> u64 {
    u64::from_be_bytes(bytes)
}

pub fn encode_u64(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

/// The `(offset, length)` pair in front of every block and stump payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub offset: u64,
    pub length: u64,
}

impl RecordHeader {
    pub const TERMINATOR: Self = Self {
        offset: 0,
        length: 0,
    };

    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    pub fn is_terminator(&self) -> bool {
        *self == Self::TERMINATOR
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..8].copy_from_slice(&encode_u64(self.offset));
        out[8..].copy_from_slice(&encode_u64(self.length));
        out
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut offset = [0u8; 8];
        let mut length = [0u8; 8];
        offset.copy_from_slice(&bytes[..8]);
        length.copy_from_slice(&bytes[8..]);
        Self {
            offset: decode_u64(offset),
            length: decode_u64(length),
        }
    }

    /// End of the byte range this record covers, if it stays inside the signed offset domain.
    pub fn checked_end(&self) -> Option<u64> {
        if self.offset > MAX_OFFSET {
            return None;
        }
        self.offset
            .checked_add(self.length)
            .filter(|end| *end <= MAX_OFFSET)
    }
}
