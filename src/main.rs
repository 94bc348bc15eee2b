//! Crypto Report CLI
//!
//! Reads a CSV of exchange operations and writes the pipe-delimited
//! monthly report to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv --utc-offset=-03:00 > report.txt
//! ```
//!
//! # Options
//!
//! - `--crlf`: separate lines with CRLF instead of LF
//! - `--trailing-newline`: end the last line with the separator
//! - `--utc-offset=±HH:MM`: offset for calendar dates (default UTC)
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use crypto_report::config::parse_utc_offset;
use crypto_report::{read_report, LineSeparator, ReportError, ReportOptions, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let (input_path, options) = parse_args(env::args().skip(1))?;

    let file = File::open(&input_path)?;
    let reader = BufReader::new(file);

    let report = read_report(reader, options)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    report.write_output(handle)?;

    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<(String, ReportOptions)> {
    let mut input_path = None;
    let mut options = ReportOptions::default();

    for arg in args {
        if arg == "--crlf" {
            options.line_separator = LineSeparator::CrLf;
        } else if arg == "--trailing-newline" {
            options.trailing_separator = true;
        } else if let Some(value) = arg.strip_prefix("--utc-offset=") {
            options.utc_offset = parse_utc_offset(value).ok_or_else(|| {
                ReportError::InvalidArgument(format!("bad UTC offset '{}'", value))
            })?;
        } else if arg.starts_with("--") {
            return Err(ReportError::InvalidArgument(format!("unknown option '{}'", arg)));
        } else if input_path.is_none() {
            input_path = Some(arg);
        } else {
            return Err(ReportError::InvalidArgument(format!(
                "unexpected argument '{}'",
                arg
            )));
        }
    }

    let input_path = input_path.ok_or(ReportError::MissingArgument)?;
    Ok((input_path, options))
}
