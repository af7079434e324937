use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rawdump::{peek_path, PEEK_DEFAULT_LEN};
use rawdump_tools::{offset_arg, peek_length_arg, HostPlatform};

/// Print the NUL-terminated string stored at an offset of a file or device.
#[derive(Debug, Parser)]
#[command(name = "peek-string", version)]
struct Args {
    /// Offset of the string (decimal, 0x-hex or 0-octal).
    #[arg(short, long, value_parser = offset_arg)]
    offset: u64,

    /// Longest string to accept, not counting the NUL.
    #[arg(
        short = 'l',
        long = "length",
        default_value_t = PEEK_DEFAULT_LEN,
        value_parser = peek_length_arg
    )]
    max_len: u64,

    /// File or device to read.
    source: PathBuf,
}

fn main() -> ExitCode {
    let program = rawdump_tools::program_name("peek-string");
    let args: Args = rawdump_tools::parse_args();
    rawdump_tools::init_logging(true);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => rawdump_tools::report_failure(&program, &err),
    }
}

fn run(args: Args) -> Result<()> {
    let text = peek_path(&args.source, args.offset, args.max_len, &HostPlatform)
        .with_context(|| format!("peek {} at {}", args.source.display(), args.offset))?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&text)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
