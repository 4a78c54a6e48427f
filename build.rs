//! Renders the `rds-promote(1)` manual page from the clap definitions.
//!
//! The page lands in `OUT_DIR` so packaging can pick it up without the
//! binary being run.

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

const MAN_PAGE: &str = "rds-promote.1";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cargo = io::stdout().lock();
    for watched in ["build.rs", "src/cli/mod.rs"] {
        writeln!(cargo, "cargo:rerun-if-changed={watched}")?;
    }

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR is not set"))?;

    let mut page = BufWriter::new(File::create(out_dir.join(MAN_PAGE))?);
    Man::new(cli::Cli::command()).render(&mut page)?;
    page.flush()?;
    Ok(())
}
