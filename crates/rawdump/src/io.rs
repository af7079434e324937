use std::io::{ErrorKind, Read, Write};

use crate::error::{DumpError, Result};
use crate::format::{decode_u64, RecordHeader, HEADER_LEN, MAX_READ_SIZE, MAX_WRITE_SIZE};

/// Outcome of [`ReadBoundedExt::read_full`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The whole buffer was filled.
    Full,
    /// The very first read returned no data.
    Eof,
}

pub trait ReadBoundedExt: Read {
    /// Fill `buf` completely, reading at most [`MAX_READ_SIZE`] bytes per call.
    ///
    /// A clean end of stream before any byte is [`Fill::Eof`]; running dry after partial
    /// progress is [`DumpError::ShortRead`].
    fn read_full(&mut self, buf: &mut [u8]) -> Result<Fill> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let want = (buf.len() - filled).min(MAX_READ_SIZE);
            match self.read(&mut buf[filled..filled + want]) {
                Ok(0) if filled == 0 => return Ok(Fill::Eof),
                Ok(0) => {
                    return Err(DumpError::ShortRead {
                        expected: buf.len(),
                        read: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Fill::Full)
    }

    /// Like [`read_full`](Self::read_full) but end of stream is an error naming `what`.
    fn read_required(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        match self.read_full(buf)? {
            Fill::Full => Ok(()),
            Fill::Eof => Err(DumpError::UnexpectedEof(what)),
        }
    }

    fn read_u64_be(&mut self, what: &'static str) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_required(&mut buf, what)?;
        Ok(decode_u64(buf))
    }

    fn read_header(&mut self) -> Result<RecordHeader> {
        let mut buf = [0u8; HEADER_LEN];
        self.read_required(&mut buf, "header")?;
        Ok(RecordHeader::decode(&buf))
    }
}

impl<T: Read + ?Sized> ReadBoundedExt for T {}

pub trait WriteBoundedExt: Write {
    /// Write all of `buf`, at most [`MAX_WRITE_SIZE`] bytes per call. A write that accepts
    /// nothing means the destination is broken.
    fn write_full(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0usize;
        while written < buf.len() {
            let want = (buf.len() - written).min(MAX_WRITE_SIZE);
            match self.write(&buf[written..written + want]) {
                Ok(0) => return Err(DumpError::WriteZero),
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn write_header(&mut self, header: RecordHeader) -> Result<()> {
        self.write_full(&header.encode())
    }
}

impl<T: Write + ?Sized> WriteBoundedExt for T {}

/// Allocate the staging buffer payloads are streamed through.
pub fn staging_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| DumpError::OutOfMemory { len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Move exactly `len` bytes from `src` to `dst` through `buf`, one buffer-sized chunk at a
/// time. `on_chunk` sees the size of each chunk after it has been written.
pub fn stream_exact<R, W, F>(
    src: &mut R,
    dst: &mut W,
    mut len: u64,
    buf: &mut [u8],
    what: &'static str,
    mut on_chunk: F,
) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(usize),
{
    if len > 0 && buf.is_empty() {
        return Err(std::io::Error::new(ErrorKind::InvalidInput, "empty staging buffer").into());
    }
    while len > 0 {
        let cl = usize::try_from(len).map_or(buf.len(), |l| l.min(buf.len()));
        src.read_required(&mut buf[..cl], what)?;
        dst.write_full(&buf[..cl])?;
        on_chunk(cl);
        len -= cl as u64;
    }
    Ok(())
}
