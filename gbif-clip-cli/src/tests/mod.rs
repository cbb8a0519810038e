//! Shared test harness modules for the GBIF clip CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;
use crate::fetch::{
    FetchCommandConfig, FetchRun, execute_fetch, resolve_fetch_config, run_fetch_with,
    summary_lines,
};

mod helpers;
mod steps;
