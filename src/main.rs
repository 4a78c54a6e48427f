//! Binary entry point for the `rds-promote` CLI.

mod cli;

use std::io::{self, Write};
use std::process;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, EnvArg};
use rds_promote::{
    ConfigError, Environment, PromoteConfig, PromotionError, PromotionReport, PromotionRequest,
    Promoter, RandomCredentialGenerator, RdsControlPlane, RdsError, RequestError, SiteConfig,
    Waiter,
};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
enum CliError {
    #[error("Config file not found, exiting...")]
    MissingSiteFile,
    #[error("site file path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    #[error("promotion failed: {0}")]
    Promotion(#[from] PromotionError<RdsError>),
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

impl From<EnvArg> for Environment {
    fn from(value: EnvArg) -> Self {
        match value {
            EnvArg::Dev => Self::Dev,
            EnvArg::Test => Self::Test,
            EnvArg::Prod => Self::Prod,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => 0,
            Err(err) => {
                report_error(&err);
                EXIT_FAILURE
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted; the provider may still be applying the last request");
            writeln!(io::stderr(), "interrupted").ok();
            EXIT_INTERRUPTED
        }
    };

    process::exit(exit_code);
}

/// Per-poll progress is logged at info, so the crate's own events show by
/// default while dependencies stay at warn.
const fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "rds_promote=debug,warn"
    } else {
        "rds_promote=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let path = site_path(cli)?;
    let site = SiteConfig::load(&path)?;
    let tuning = PromoteConfig::load_without_cli_args()?;
    tuning.validate()?;
    let request = PromotionRequest::new(cli.env.into(), site.base_name())?;

    tracing::info!(
        env = %request.target(),
        base = request.base(),
        region = %site.aws_region,
        "starting promotion"
    );
    let plane = RdsControlPlane::connect(&site.aws_region).await;
    let generator = RandomCredentialGenerator::default();
    let report = Promoter::new(
        &plane,
        &generator,
        Waiter::new(tuning.wait_policy()),
        site.provision_settings(&tuning),
    )
    .promote(&request)
    .await?;

    write_report(io::stdout(), &report)?;
    Ok(())
}

/// Resolves the site file path, failing before any provider call when the
/// file does not exist.
fn site_path(cli: &Cli) -> Result<Utf8PathBuf, CliError> {
    let path = Utf8PathBuf::from_path_buf(cli.config.clone())
        .map_err(|path| CliError::NonUtf8Path(path.display().to_string()))?;
    ensure_exists(&path)?;
    Ok(path)
}

fn ensure_exists(path: &Utf8Path) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::MissingSiteFile)
    }
}

fn write_report(mut out: impl Write, report: &PromotionReport) -> io::Result<()> {
    if report.is_noop() {
        writeln!(out, "{} slot already occupied; nothing to do", report.target)?;
    } else {
        for step in &report.steps {
            let marker = if step.applied { "done" } else { "skipped (already exists)" };
            writeln!(out, "{}: {marker}", step.step)?;
        }
    }
    if !report.endpoint.is_empty() {
        writeln!(out, "endpoint: {}", report.endpoint)?;
    }
    if let Some(credential) = &report.credential {
        writeln!(out, "master password: {}", credential.expose())?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
