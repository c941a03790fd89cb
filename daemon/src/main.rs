//! respawn binary
//!
//! Supervises a pool of worker processes, or runs one worker when started with
//! the hidden `worker` subcommand.

use clap::Parser;
use daemon::Cli;
use respawn_core::utils::init_tracing;
use std::process::ExitCode;
use tracing::{error, Instrument};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("respawn: {e}");
        return ExitCode::FAILURE;
    }

    let span = daemon::process_span(&cli);
    match daemon::run(cli).instrument(span.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            span.in_scope(|| error!("{}", e));
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
