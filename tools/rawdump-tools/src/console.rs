use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rawdump::{
    plan_blocks, BlockEvent, FileKind, Phase, Progress, Stump, TransferSummary, BLOCK_LEN,
};
use tracing::{debug, info};

/// Which end of the transfer the console is narrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `create-dump`: reading a source, writing a stream.
    Source,
    /// `install-dump`: reading a stream, writing a destination.
    Destination,
}

/// Progress bar plus log narration for the command-line tools.
///
/// Log lines are emitted through [`ProgressBar::suspend`] so they never tear the bar.
pub struct ConsoleProgress {
    role: Role,
    bar: ProgressBar,
    last_phase: Option<Phase>,
}

impl ConsoleProgress {
    pub fn new(role: Role, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::no_length()
        };
        let style = match role {
            Role::Source => ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg} ({eta})",
            ),
            Role::Destination => {
                ProgressStyle::with_template("[{elapsed_precise}] {spinner} {bytes} {msg}")
            }
        };
        if let Ok(style) = style {
            bar.set_style(style.progress_chars("##-"));
        }
        Self {
            role,
            bar,
            last_phase: None,
        }
    }

    fn log(&self, f: impl FnOnce()) {
        self.bar.suspend(f);
    }

    fn end_of_blocks(&self) {
        match self.role {
            Role::Source => self.log(|| info!("Input chunks written.")),
            Role::Destination => self.log(|| info!("End of input reached.")),
        }
    }
}

impl Progress for ConsoleProgress {
    fn probed(&mut self, kind: FileKind, size: Option<u64>) {
        match self.role {
            Role::Source => self.log(|| info!("Input is a {}.", kind.describe())),
            Role::Destination => self.log(|| info!("Destination is a {}.", kind.describe())),
        }
        if let Some(size) = size {
            self.log(|| info!("Source size is {size} bytes."));
            self.bar.set_length(size);
        }
    }

    fn phase(&mut self, phase: Phase) {
        let previous = self.last_phase.replace(phase);
        match phase {
            Phase::AwaitMagic => self.log(|| debug!("waiting for dump magic")),
            Phase::Blocks => {
                if self.role == Role::Source {
                    if let Some(size) = self.bar.length() {
                        let blocks = plan_blocks(size, BLOCK_LEN).block_count();
                        self.log(|| info!("Dumpfile will have {blocks} blocks."));
                    }
                }
            }
            Phase::Stumps => {
                self.end_of_blocks();
                self.log(|| info!("Writing stumps."));
            }
            Phase::Syncing => {
                match previous {
                    Some(Phase::Blocks) => self.end_of_blocks(),
                    Some(Phase::Stumps) => self.log(|| info!("End of stumps reached.")),
                    _ => {}
                }
                self.bar.set_message("syncing");
            }
            Phase::Rebooting => {
                self.bar.finish_and_clear();
                info!("Attempting to reboot");
            }
            Phase::Done => {
                if self.role == Role::Source {
                    match previous {
                        Some(Phase::Blocks) => self.end_of_blocks(),
                        Some(Phase::Stumps) => self.log(|| info!("End of stumps reached.")),
                        _ => {}
                    }
                }
                self.bar.finish_and_clear();
            }
        }
    }

    fn block_started(&mut self, block: &BlockEvent) {
        self.bar.set_message(format!("block {}", block.index));
        self.log(|| {
            debug!(
                index = block.index,
                offset = block.offset,
                length = block.length,
                "block"
            )
        });
    }

    fn chunk_done(&mut self, bytes: usize) {
        self.bar.inc(bytes as u64);
    }

    fn block_done(&mut self, block: &BlockEvent, elapsed: Duration) {
        self.log(|| {
            debug!(
                "block {} at {} ({} bytes) ok in {:.6}s",
                block.index,
                block.offset,
                block.length,
                elapsed.as_secs_f64()
            )
        });
    }

    fn stump_done(&mut self, stump: &Stump, elapsed: Duration) {
        let text = String::from_utf8_lossy(stump.text());
        self.log(|| {
            info!(
                "stump {:?} at {} ok in {:.6}s",
                text,
                stump.offset(),
                elapsed.as_secs_f64()
            )
        });
    }

    fn finished(&mut self, summary: &TransferSummary) {
        self.bar.finish_and_clear();
        println!(
            "Written {} blocks, {} bytes total.",
            summary.blocks, summary.bytes
        );
    }
}
