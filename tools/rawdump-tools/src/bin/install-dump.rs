use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rawdump::{install_to_path, InstallOptions, Stump, Stumps};
use rawdump_tools::{ConsoleProgress, HostPlatform, Role};

/// Install a dump read from stdin onto an existing file or device.
#[derive(Debug, Parser)]
#[command(name = "install-dump", version)]
struct Args {
    /// Reboot the machine once the destination has been synced.
    #[arg(short, long)]
    reboot: bool,

    /// Patch `<offset>:<string>` into the destination after the dump. May be repeated; the
    /// first one given wins where they overlap.
    #[arg(short = 'S', long = "stump", value_name = "OFFSET:STRING")]
    stumps: Vec<Stump>,

    /// Hide the progress bar and informational messages.
    #[arg(short, long)]
    quiet: bool,

    /// Existing file or device to overwrite.
    destination: PathBuf,
}

fn main() -> ExitCode {
    let program = rawdump_tools::program_name("install-dump");
    let args: Args = rawdump_tools::parse_args();
    rawdump_tools::init_logging(args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => rawdump_tools::report_failure(&program, &err),
    }
}

fn run(args: Args) -> Result<()> {
    let stumps: Stumps = args.stumps.into_iter().collect();
    let options = InstallOptions {
        reboot: args.reboot,
        ..InstallOptions::default()
    };
    let mut progress = ConsoleProgress::new(Role::Destination, args.quiet);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    install_to_path(
        &args.destination,
        &mut input,
        &stumps,
        &options,
        &HostPlatform,
        &mut progress,
    )
    .with_context(|| format!("install dump to {}", args.destination.display()))?;
    Ok(())
}
