use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rawdump::{create_to_path, CreateOptions, Stump, Stumps};
use rawdump_tools::{ConsoleProgress, HostPlatform, Role};

/// Serialize a regular file or device node into a dump file.
#[derive(Debug, Parser)]
#[command(name = "create-dump", version)]
struct Args {
    /// Patch `<offset>:<string>` into the dump after the blocks. May be repeated; later
    /// stumps are written first, so the first one given wins where they overlap.
    #[arg(short = 'S', long = "stump", value_name = "OFFSET:STRING")]
    stumps: Vec<Stump>,

    /// Hide the progress bar and informational messages.
    #[arg(short, long)]
    quiet: bool,

    /// File or device to dump.
    source: PathBuf,

    /// Dump file to create. Must not exist yet.
    destination: PathBuf,
}

fn main() -> ExitCode {
    let program = rawdump_tools::program_name("create-dump");
    let args: Args = rawdump_tools::parse_args();
    rawdump_tools::init_logging(args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => rawdump_tools::report_failure(&program, &err),
    }
}

fn run(args: Args) -> Result<()> {
    let stumps: Stumps = args.stumps.into_iter().collect();
    let mut progress = ConsoleProgress::new(Role::Source, args.quiet);

    create_to_path(
        &args.source,
        &args.destination,
        &stumps,
        &CreateOptions::default(),
        &HostPlatform,
        &mut progress,
    )
    .with_context(|| {
        format!(
            "dump {} to {}",
            args.source.display(),
            args.destination.display()
        )
    })?;
    Ok(())
}
