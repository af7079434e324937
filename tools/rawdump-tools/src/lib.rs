//! Shared plumbing for the `create-dump`, `install-dump` and `peek-string` binaries.

mod console;
mod host;

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use console::{ConsoleProgress, Role};
pub use host::HostPlatform;

/// Base name of the running executable, used to prefix error messages.
pub fn program_name(fallback: &str) -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .and_then(OsStr::to_str)
        .map(str::to_owned)
        .unwrap_or_else(|| fallback.to_owned())
}

/// Parse the command line. Usage errors exit with status 1; `--help` and `--version` exit 0.
pub fn parse_args<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

/// Route `tracing` output to stderr. `RUST_LOG` overrides the default level.
pub fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Print `<program>: <error chain>` and return the failure status.
pub fn report_failure(program: &str, err: &anyhow::Error) -> ExitCode {
    tracing::debug!(error = ?err, "fatal");
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{program}: {err:#}");
    let _ = stderr.flush();
    ExitCode::FAILURE
}

/// clap value parser for `-o`-style offsets.
pub fn offset_arg(text: &str) -> Result<u64, String> {
    rawdump::parse_offset(text).map_err(|err| err.to_string())
}

/// clap value parser for peek lengths: an offset-grammar number no larger than the peek limit.
pub fn peek_length_arg(text: &str) -> Result<u64, String> {
    let len = rawdump::parse_offset(text).map_err(|_| format!("bad length \"{text}\""))?;
    if len > rawdump::PEEK_MAX_LEN {
        return Err(format!(
            "length {len} exceeds the maximum of {}",
            rawdump::PEEK_MAX_LEN
        ));
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_arg_reports_parse_errors() {
        assert_eq!(offset_arg("0x10"), Ok(16));
        assert!(offset_arg("ten").unwrap_err().contains("ten"));
    }

    #[test]
    fn peek_length_is_capped() {
        assert_eq!(peek_length_arg("64"), Ok(64));
        assert_eq!(peek_length_arg("65536"), Ok(65536));
        assert!(peek_length_arg("65537").is_err());
        assert!(peek_length_arg("-1").is_err());
    }

    #[test]
    fn program_name_has_no_directory() {
        let name = program_name("fallback");
        assert!(!name.contains('/'));
        assert!(!name.is_empty());
    }
}
