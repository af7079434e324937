use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Instant;

use crate::error::{DumpError, Result};
use crate::format::{
    encode_u64, RecordHeader, BLOCK_LEN, CHUNK_LEN, DUMP_MAGIC, MAX_SOURCE_MIB, MIB,
};
use crate::io::{staging_buffer, stream_exact, WriteBoundedExt};
use crate::parse::Stumps;
use crate::platform::{open_no_follow, source_size, FileKind, Platform};
use crate::progress::{BlockEvent, Phase, Progress, TransferSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    /// Maximum payload length of one block record.
    pub block_len: u64,
    /// Staging buffer size; payloads are copied one chunk at a time.
    pub chunk_len: usize,
    /// Sources with `size / MiB` above this are refused.
    pub max_source_mib: u64,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            block_len: BLOCK_LEN,
            chunk_len: CHUNK_LEN,
            max_source_mib: MAX_SOURCE_MIB,
        }
    }
}

/// Refuse empty sources and sources beyond the configured limit.
pub fn check_source_size(size: u64, options: &CreateOptions) -> Result<()> {
    if size < 1 {
        return Err(DumpError::EmptySource);
    }
    if size / MIB > options.max_source_mib {
        return Err(DumpError::SourceTooLarge {
            size,
            max_mib: options.max_source_mib,
        });
    }
    Ok(())
}

/// Blocks of a source, last block first.
#[derive(Debug, Clone)]
pub struct BlockPlan {
    size: u64,
    block_len: u64,
    remaining: u64,
}

pub fn plan_blocks(size: u64, block_len: u64) -> BlockPlan {
    let block_len = block_len.max(1);
    BlockPlan {
        size,
        block_len,
        remaining: size.div_ceil(block_len),
    }
}

impl BlockPlan {
    pub fn block_count(&self) -> u64 {
        self.size.div_ceil(self.block_len)
    }
}

impl Iterator for BlockPlan {
    type Item = BlockEvent;

    fn next(&mut self) -> Option<BlockEvent> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let index = self.remaining;
        let offset = index * self.block_len;
        let length = self.block_len.min(self.size - offset);
        Some(BlockEvent {
            index,
            offset,
            length,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (n, usize::try_from(self.remaining).ok())
    }
}

/// Serialize `size` bytes of `source` into `out`: magic, blocks in descending offset order,
/// stump records, terminator.
///
/// Stump records precede the terminator and share the block record layout, so an installer
/// replays them like any other record.
pub fn write_dump<R, W, P>(
    source: &mut R,
    size: u64,
    out: &mut W,
    stumps: &Stumps,
    options: &CreateOptions,
    progress: &mut P,
) -> Result<TransferSummary>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
    P: Progress + ?Sized,
{
    let mut buf = staging_buffer(options.chunk_len.max(1))?;
    let mut summary = TransferSummary::default();

    out.write_full(&encode_u64(DUMP_MAGIC))?;

    progress.phase(Phase::Blocks);
    for block in plan_blocks(size, options.block_len) {
        let header = RecordHeader::new(block.offset, block.length);
        if header.checked_end().is_none() {
            return Err(DumpError::BadOffset {
                offset: block.offset,
                length: block.length,
            });
        }
        progress.block_started(&block);
        out.write_header(header)?;
        let pos = source.seek(SeekFrom::Start(block.offset))?;
        if pos != block.offset {
            return Err(io::Error::other("can't seek input").into());
        }

        let started = Instant::now();
        stream_exact(source, out, block.length, &mut buf, "source", |n| {
            progress.chunk_done(n)
        })?;
        progress.block_done(&block, started.elapsed());

        summary.blocks += 1;
        summary.bytes += block.length;
    }

    if !stumps.is_empty() {
        progress.phase(Phase::Stumps);
        for stump in stumps {
            let started = Instant::now();
            out.write_header(stump.header())?;
            out.write_full(stump.payload())?;
            progress.stump_done(stump, started.elapsed());
            summary.stumps += 1;
        }
    }

    out.write_header(RecordHeader::TERMINATOR)?;
    out.flush()?;
    progress.finished(&summary);
    progress.phase(Phase::Done);
    Ok(summary)
}

/// Dump the file or device at `source_path` into a newly created `dest_path`.
///
/// Every check on the source runs before the destination is created. On failure the
/// destination may be left behind partially written.
pub fn create_to_path<P, G>(
    source_path: &Path,
    dest_path: &Path,
    stumps: &Stumps,
    options: &CreateOptions,
    platform: &P,
    progress: &mut G,
) -> Result<TransferSummary>
where
    P: Platform + ?Sized,
    G: Progress + ?Sized,
{
    let (kind, meta) = FileKind::probe(source_path)?;
    let size = source_size(source_path, kind, &meta, platform)?;
    progress.probed(kind, Some(size));
    check_source_size(size, options)?;

    let mut source = open_no_follow(OpenOptions::new().read(true), source_path)?;
    let mut out = open_no_follow(OpenOptions::new().write(true).create_new(true), dest_path)
        .map_err(|err| match err {
            DumpError::Open { path, source } if source.kind() == io::ErrorKind::AlreadyExists => {
                DumpError::DestinationExists { path }
            }
            err => err,
        })?;

    let summary = write_dump(&mut source, size, &mut out, stumps, options, progress)?;
    out.sync_all().map_err(DumpError::Sync)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HEADER_LEN;
    use crate::parse::parse_stump;
    use crate::platform::testing::FakePlatform;
    use crate::progress::Recorder;
    use std::io::Cursor;

    fn small_options(block_len: u64, chunk_len: usize) -> CreateOptions {
        CreateOptions {
            block_len,
            chunk_len,
            ..CreateOptions::default()
        }
    }

    fn headers(plan: BlockPlan) -> Vec<(u64, u64)> {
        plan.map(|b| (b.offset, b.length)).collect()
    }

    #[test]
    fn plan_is_descending_and_covers_source() {
        assert_eq!(
            headers(plan_blocks(25, 10)),
            vec![(20, 5), (10, 10), (0, 10)]
        );
        let indices: Vec<u64> = plan_blocks(25, 10).map(|b| b.index).collect();
        assert_eq!(indices, vec![2, 1, 0]);
    }

    #[test]
    fn exact_multiple_yields_full_blocks() {
        let plan = plan_blocks(3 * BLOCK_LEN, BLOCK_LEN);
        assert_eq!(plan.block_count(), 3);
        assert!(plan.clone().all(|b| b.length == BLOCK_LEN));
        assert_eq!(plan.count(), 3);
    }

    #[test]
    fn one_byte_past_multiple_adds_a_tiny_block() {
        let blocks = headers(plan_blocks(3 * BLOCK_LEN + 1, BLOCK_LEN));
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0], (3 * BLOCK_LEN, 1));
        assert!(blocks[1..].iter().all(|(_, len)| *len == BLOCK_LEN));
    }

    #[test]
    fn empty_plan_for_empty_source() {
        assert_eq!(plan_blocks(0, 10).count(), 0);
    }

    #[test]
    fn source_size_limits() {
        let opts = CreateOptions::default();
        assert!(matches!(
            check_source_size(0, &opts),
            Err(DumpError::EmptySource)
        ));
        check_source_size(1, &opts).unwrap();
        // size / MiB == 1 Mi is still fine.
        check_source_size(MIB * MIB + MIB - 1, &opts).unwrap();
        assert!(matches!(
            check_source_size(MIB * MIB + MIB, &opts),
            Err(DumpError::SourceTooLarge { .. })
        ));
        assert!(check_source_size(u64::MAX, &opts).is_err());
    }

    #[test]
    fn dump_layout_is_magic_blocks_stumps_terminator() {
        let data: Vec<u8> = (0..25u8).collect();
        let stumps: Stumps = ["3:ab"].iter().map(|s| parse_stump(s).unwrap()).collect();
        let mut out = Vec::new();
        let summary = write_dump(
            &mut Cursor::new(data.clone()),
            25,
            &mut out,
            &stumps,
            &small_options(10, 4),
            &mut (),
        )
        .unwrap();
        assert_eq!(
            summary,
            TransferSummary {
                blocks: 3,
                bytes: 25,
                stumps: 1
            }
        );

        let mut expected = encode_u64(DUMP_MAGIC).to_vec();
        for (off, len) in [(20u64, 5u64), (10, 10), (0, 10)] {
            expected.extend_from_slice(&RecordHeader::new(off, len).encode());
            expected.extend_from_slice(&data[off as usize..(off + len) as usize]);
        }
        expected.extend_from_slice(&RecordHeader::new(3, 3).encode());
        expected.extend_from_slice(b"ab\0");
        expected.extend_from_slice(&RecordHeader::TERMINATOR.encode());
        assert_eq!(out, expected);
    }

    #[test]
    fn progress_sees_every_chunk() {
        let mut rec = Recorder::default();
        let mut out = Vec::new();
        write_dump(
            &mut Cursor::new(vec![1u8; 25]),
            25,
            &mut out,
            &Stumps::new(),
            &small_options(10, 4),
            &mut rec,
        )
        .unwrap();
        assert_eq!(rec.chunks, vec![4, 1, 4, 4, 2, 4, 4, 2]);
        assert_eq!(rec.phases, vec![Phase::Blocks, Phase::Done]);
        assert_eq!(rec.finished.map(|s| s.bytes), Some(25));
        assert_eq!(rec.blocks.len(), 3);
        assert_eq!(out.len(), 8 + 3 * HEADER_LEN + 25 + HEADER_LEN);
    }

    #[test]
    fn short_source_aborts() {
        let mut out = Vec::new();
        let err = write_dump(
            &mut Cursor::new(vec![0u8; 5]),
            25,
            &mut out,
            &Stumps::new(),
            &small_options(10, 4),
            &mut (),
        )
        .unwrap_err();
        // The last block is read first and lies entirely past the end.
        assert!(matches!(err, DumpError::UnexpectedEof("source")));
    }

    #[test]
    fn oversized_source_is_refused_before_destination_exists() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.img");
        let dst = dir.path().join("out.dump");
        std::fs::write(&src, vec![0u8; 2 * MIB as usize]).unwrap();

        let opts = CreateOptions {
            max_source_mib: 1,
            ..CreateOptions::default()
        };
        let err = create_to_path(
            &src,
            &dst,
            &Stumps::new(),
            &opts,
            &FakePlatform::default(),
            &mut (),
        )
        .unwrap_err();
        assert!(matches!(err, DumpError::SourceTooLarge { .. }));
        assert!(!dst.exists());
    }

    #[test]
    fn existing_destination_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.img");
        let dst = dir.path().join("out.dump");
        std::fs::write(&src, b"data").unwrap();
        std::fs::write(&dst, b"keep me").unwrap();

        let err = create_to_path(
            &src,
            &dst,
            &Stumps::new(),
            &CreateOptions::default(),
            &FakePlatform::default(),
            &mut (),
        )
        .unwrap_err();
        assert!(matches!(err, DumpError::DestinationExists { .. }));
        assert_eq!(std::fs::read(&dst).unwrap(), b"keep me");
    }
}
