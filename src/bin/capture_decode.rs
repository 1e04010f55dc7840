//! Offline decoder for relay capture files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use nox_relay::capture::decode_stream;
use nox_relay::config::LoggingConfig;
use nox_relay::utils::logging::init_logging;
use nox_relay::Result;

#[derive(Parser, Debug)]
#[command(name = "nox-capture-decode")]
#[command(about = "Decode a nox-relay capture into per-message records", long_about = None)]
struct Args {
    /// Capture file written by the relay
    #[arg(short, long, default_value = "network.jsonl")]
    input: PathBuf,

    /// Destination for decoded records
    #[arg(short, long, default_value = "network-dec.jsonl")]
    output: PathBuf,
}

fn run(args: &Args) -> Result<usize> {
    let reader = BufReader::new(File::open(&args.input)?);
    let writer = BufWriter::new(File::create(&args.output)?);
    decode_stream(reader, writer)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&LoggingConfig::default()) {
        eprintln!("nox-capture-decode: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(count) => {
            info!(count, output = %args.output.display(), "Capture decoded");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, input = %args.input.display(), "Cannot decode capture");
            ExitCode::FAILURE
        }
    }
}
