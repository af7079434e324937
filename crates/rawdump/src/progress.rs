use std::time::Duration;

use crate::parse::Stump;
use crate::platform::FileKind;

/// Where a create or install run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitMagic,
    Blocks,
    Stumps,
    Syncing,
    Rebooting,
    Done,
}

/// One block record, as written or as received.
///
/// `index` counts down from the last block on the writer side and up from 1 on the installer
/// side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEvent {
    pub index: u64,
    pub offset: u64,
    pub length: u64,
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub blocks: u64,
    pub bytes: u64,
    pub stumps: usize,
}

/// Observer for long-running transfers. All methods default to doing nothing.
pub trait Progress {
    fn probed(&mut self, _kind: FileKind, _size: Option<u64>) {}

    fn phase(&mut self, _phase: Phase) {}

    fn block_started(&mut self, _block: &BlockEvent) {}

    /// Called once per staging-buffer chunk moved.
    fn chunk_done(&mut self, _bytes: usize) {}

    fn block_done(&mut self, _block: &BlockEvent, _elapsed: Duration) {}

    fn stump_done(&mut self, _stump: &Stump, _elapsed: Duration) {}

    /// Called once all data is written, before any reboot.
    fn finished(&mut self, _summary: &TransferSummary) {}
}

impl Progress for () {}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn probed(&mut self, kind: FileKind, size: Option<u64>) {
        (**self).probed(kind, size)
    }

    fn phase(&mut self, phase: Phase) {
        (**self).phase(phase)
    }

    fn block_started(&mut self, block: &BlockEvent) {
        (**self).block_started(block)
    }

    fn chunk_done(&mut self, bytes: usize) {
        (**self).chunk_done(bytes)
    }

    fn block_done(&mut self, block: &BlockEvent, elapsed: Duration) {
        (**self).block_done(block, elapsed)
    }

    fn stump_done(&mut self, stump: &Stump, elapsed: Duration) {
        (**self).stump_done(stump, elapsed)
    }

    fn finished(&mut self, summary: &TransferSummary) {
        (**self).finished(summary)
    }
}

/// Records every callback; used by tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub phases: Vec<Phase>,
    pub blocks: Vec<BlockEvent>,
    pub chunks: Vec<usize>,
    pub stumps: Vec<Vec<u8>>,
    pub finished: Option<TransferSummary>,
}

#[cfg(test)]
impl Progress for Recorder {
    fn phase(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    fn block_started(&mut self, block: &BlockEvent) {
        self.blocks.push(*block);
    }

    fn chunk_done(&mut self, bytes: usize) {
        self.chunks.push(bytes);
    }

    fn stump_done(&mut self, stump: &Stump, _elapsed: Duration) {
        self.stumps.push(stump.text().to_vec());
    }

    fn finished(&mut self, summary: &TransferSummary) {
        self.finished = Some(*summary);
    }
}
