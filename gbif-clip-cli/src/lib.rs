//! Command-line interface for the GBIF occurrence fetch-and-clip pipeline.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fetch;
mod fs;
mod interrupt;
mod layers;
mod progress;
mod registry;

pub use error::CliError;

use fetch::FetchArgs;

const ARG_EXTENT: &str = "extent";
const ARG_OVERLAY: &str = "overlay";
const ARG_OUTPUT_DIR: &str = "output-dir";
const ARG_BASE_URL: &str = "base-url";
const ARG_MAX_RECORDS: &str = "max-records";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_REGISTER_FETCH_LAYER: &str = "register-fetch-layer";
const ENV_EXTENT: &str = "GBIF_CLIP_CMDS_FETCH_EXTENT";
const ENV_OVERLAY: &str = "GBIF_CLIP_CMDS_FETCH_OVERLAY";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] when arguments or configuration are invalid, an
/// input layer cannot be read, or the pipeline fails.
pub fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            return err.print().map_err(CliError::WriteSummary);
        }
        Err(err) => return Err(CliError::ArgumentParsing(err)),
    };
    match cli.command {
        Command::Fetch(args) => fetch::run_fetch(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "gbif-clip",
    about = "Fetch GBIF occurrence records for a region and clip them to a polygon layer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch occurrences inside an extent and clip them to an overlay.
    Fetch(FetchArgs),
}

#[cfg(test)]
mod tests;
