use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{DumpError, Result};
use crate::io::{staging_buffer, ReadBoundedExt};
use crate::platform::{open_no_follow, source_size, FileKind, Platform};

pub const PEEK_DEFAULT_LEN: u64 = 64;
pub const PEEK_MAX_LEN: u64 = 0x10000;

/// Read the NUL-terminated string at `offset`.
///
/// Up to `max_len + 1` bytes are examined, fewer when the source ends sooner. The returned
/// bytes exclude the NUL.
pub fn peek_string<R>(
    source: &mut R,
    source_size: u64,
    offset: u64,
    max_len: u64,
) -> Result<Vec<u8>>
where
    R: Read + Seek + ?Sized,
{
    if max_len > PEEK_MAX_LEN {
        return Err(DumpError::PeekTooLong {
            len: max_len,
            max: PEEK_MAX_LEN,
        });
    }
    let end = offset.checked_add(max_len).ok_or(DumpError::BadOffset {
        offset,
        length: max_len,
    })?;
    if offset >= source_size {
        return Err(DumpError::OffsetBeyondSource {
            offset,
            size: source_size,
        });
    }
    let len = if end > source_size {
        source_size - offset - 1
    } else {
        max_len
    };

    // len < PEEK_MAX_LEN here, so the window always fits in usize.
    let mut buf = staging_buffer(len as usize + 1)?;
    source.seek(SeekFrom::Start(offset))?;
    source.read_required(&mut buf, "peek")?;

    let nul = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or(DumpError::Unterminated)?;
    buf.truncate(nul);
    Ok(buf)
}

pub fn peek_path<P: Platform + ?Sized>(
    path: &Path,
    offset: u64,
    max_len: u64,
    platform: &P,
) -> Result<Vec<u8>> {
    let (kind, meta) = FileKind::probe(path)?;
    let size = source_size(path, kind, &meta, platform)?;
    let mut file = open_no_follow(OpenOptions::new().read(true), path)?;
    peek_string(&mut file, size, offset, max_len)
}
