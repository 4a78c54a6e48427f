//! Command-line interface definitions for the `rds-promote` binary.
//!
//! This module only depends on clap so the build script can include it when
//! generating the manual page.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Site file read when `--config` is not given.
pub(crate) const DEFAULT_SITE_FILE: &str = "./config.site";

/// Slot selected on the command line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub(crate) enum EnvArg {
    /// Refresh the development slot.
    #[default]
    Dev,
    /// Promote dev into the test slot.
    Test,
    /// Promote test into the production slot.
    Prod,
}

/// Top-level CLI for the `rds-promote` binary.
#[derive(Debug, Parser)]
#[command(
    name = "rds-promote",
    version,
    about = "Promote an Aurora cluster through the dev, test and prod slots"
)]
pub(crate) struct Cli {
    /// Slot to promote into.
    #[arg(long = "env", value_enum, ignore_case = true, default_value_t = EnvArg::Dev)]
    pub(crate) env: EnvArg,
    /// Path of the site file holding `dbuser`, `dbname` and `awsRegion`.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SITE_FILE)]
    pub(crate) config: PathBuf,
    /// Log progress at debug level (overridden by `RUST_LOG`).
    #[arg(short, long)]
    pub(crate) verbose: bool,
}
