use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{DumpError, Result};
use crate::format::{CHUNK_LEN, DUMP_MAGIC};
use crate::io::{staging_buffer, stream_exact, ReadBoundedExt, WriteBoundedExt};
use crate::parse::Stumps;
use crate::platform::{open_no_follow, FileKind, Platform};
use crate::progress::{BlockEvent, Phase, Progress, TransferSummary};

pub const REBOOT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Staging buffer size; payloads are copied one chunk at a time.
    pub chunk_len: usize,
    /// Restart the machine once the destination is synced and closed.
    pub reboot: bool,
    pub reboot_delay: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            chunk_len: CHUNK_LEN,
            reboot: false,
            reboot_delay: REBOOT_DELAY,
        }
    }
}

/// A positioned, syncable install target.
pub trait Destination: Write + Seek {
    /// Push written data to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

impl Destination for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl Destination for Cursor<Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Destination for Cursor<&mut Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: Destination + ?Sized> Destination for &mut D {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Consume the leading magic and check it.
pub fn read_magic<R: Read + ?Sized>(input: &mut R) -> Result<()> {
    let found = input.read_u64_be("magic")?;
    if found != DUMP_MAGIC {
        return Err(DumpError::InvalidMagic { found });
    }
    Ok(())
}

fn seek_exact<D: Seek + ?Sized>(dest: &mut D, offset: u64) -> Result<()> {
    let pos = dest.seek(SeekFrom::Start(offset))?;
    if pos != offset {
        return Err(io::Error::other("can't seek output").into());
    }
    Ok(())
}

/// Replay block records from `input` onto `dest` until the terminator.
///
/// Records are applied in the order received; nothing is assumed about their ordering.
/// Nothing after the terminator is read.
pub fn install_blocks<R, D, P>(
    input: &mut R,
    dest: &mut D,
    buf: &mut [u8],
    progress: &mut P,
) -> Result<TransferSummary>
where
    R: Read + ?Sized,
    D: Write + Seek + ?Sized,
    P: Progress + ?Sized,
{
    let mut summary = TransferSummary::default();
    loop {
        let header = input.read_header()?;
        if header.is_terminator() {
            return Ok(summary);
        }
        if header.checked_end().is_none() {
            return Err(DumpError::BadOffset {
                offset: header.offset,
                length: header.length,
            });
        }

        let block = BlockEvent {
            index: summary.blocks + 1,
            offset: header.offset,
            length: header.length,
        };
        progress.block_started(&block);
        seek_exact(dest, header.offset)?;

        let started = Instant::now();
        stream_exact(input, dest, header.length, buf, "content", |n| {
            progress.chunk_done(n)
        })?;
        progress.block_done(&block, started.elapsed());

        summary.blocks += 1;
        summary.bytes += header.length;
    }
}

/// Write each stump's payload (NUL included) at its offset, in list order.
pub fn apply_stumps<D, P>(dest: &mut D, stumps: &Stumps, progress: &mut P) -> Result<()>
where
    D: Write + Seek + ?Sized,
    P: Progress + ?Sized,
{
    for stump in stumps {
        let started = Instant::now();
        seek_exact(dest, stump.offset())?;
        dest.write_full(stump.payload())?;
        progress.stump_done(stump, started.elapsed());
    }
    Ok(())
}

fn install_body<R, D, P>(
    input: &mut R,
    dest: &mut D,
    stumps: &Stumps,
    options: &InstallOptions,
    progress: &mut P,
) -> Result<TransferSummary>
where
    R: Read + ?Sized,
    D: Destination + ?Sized,
    P: Progress + ?Sized,
{
    let mut buf = staging_buffer(options.chunk_len.max(1))?;

    progress.phase(Phase::Blocks);
    let mut summary = install_blocks(input, dest, &mut buf, progress)?;

    if !stumps.is_empty() {
        progress.phase(Phase::Stumps);
        apply_stumps(dest, stumps, progress)?;
        summary.stumps = stumps.len();
    }

    progress.phase(Phase::Syncing);
    dest.flush()?;
    dest.sync().map_err(DumpError::Sync)?;
    progress.finished(&summary);
    Ok(summary)
}

/// Validate the magic, replay every record up to the terminator, apply `stumps`, then sync
/// `dest`.
///
/// Stumps embedded by the writer are ordinary records and are replayed with the blocks;
/// `stumps` are applied on top of them afterwards.
pub fn install_dump<R, D, P>(
    input: &mut R,
    dest: &mut D,
    stumps: &Stumps,
    options: &InstallOptions,
    progress: &mut P,
) -> Result<TransferSummary>
where
    R: Read + ?Sized,
    D: Destination + ?Sized,
    P: Progress + ?Sized,
{
    progress.phase(Phase::AwaitMagic);
    read_magic(input)?;
    let summary = install_body(input, dest, stumps, options, progress)?;
    progress.phase(Phase::Done);
    Ok(summary)
}

/// Install a dump read from `input` onto the existing file or device at `dest_path`.
///
/// The destination is opened only after the magic checks out, and it is never created or
/// truncated. With `options.reboot` set the platform is asked to restart after the destination
/// has been synced and closed.
pub fn install_to_path<R, P, G>(
    dest_path: &Path,
    input: &mut R,
    stumps: &Stumps,
    options: &InstallOptions,
    platform: &P,
    progress: &mut G,
) -> Result<TransferSummary>
where
    R: Read + ?Sized,
    P: Platform + ?Sized,
    G: Progress + ?Sized,
{
    let (kind, _) = FileKind::probe(dest_path)?;
    progress.probed(kind, None);

    progress.phase(Phase::AwaitMagic);
    read_magic(input)?;

    let mut dest = open_no_follow(OpenOptions::new().write(true), dest_path)?;
    let summary = install_body(input, &mut dest, stumps, options, progress)?;
    drop(dest);

    if options.reboot {
        progress.phase(Phase::Rebooting);
        thread::sleep(options.reboot_delay);
        platform.reboot_now().map_err(DumpError::RebootFailed)?;
    }
    progress.phase(Phase::Done);
    Ok(summary)
}
