//! lintrun CLI binary entry point.
//! Resolves configuration, runs the analyzer over each input, and exits with
//! the run's status.

use clap::Parser;
use lintrun::analyzer::SourceAnalyzer;
use lintrun::cli::{checked_inputs, Cli};
use lintrun::config::{self, CliOverrides};
use lintrun::error::CliError;
use lintrun::reporter::Reporter;
use lintrun::runner::{self, RunOptions, Runner};
use lintrun::utils;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn init_tracing(cli: &Cli) {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let layer = fmt::layer()
        .with_target(false)
        .with_ansi(utils::colors_enabled())
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

async fn run(cli: &Cli, inputs: &[String]) -> Result<i32, CliError> {
    let cwd = std::env::current_dir()?;
    let found = config::find_config(cli.config.as_deref().map(Path::new), &cwd)?;
    if found.is_none() {
        eprintln!("{} No lintrun.toml found; using defaults.", utils::note_prefix());
    }
    let overrides = CliOverrides {
        bowerdir: cli.bowerdir.as_deref(),
        policy: cli.policy.as_deref(),
        root: cli.root.as_deref(),
        output: cli.output.as_deref(),
    };
    let eff = config::resolve_effective(&overrides, found);
    let options = RunOptions {
        root: eff.root,
        policy: eff.policy,
        redirect: eff.redirect,
    };

    let mut runner = Runner::new(SourceAnalyzer::new(), Reporter::stdio(eff.output));
    // A policy failure was already printed by the runner.
    let result = runner.run(inputs, &options).await;
    Ok(runner::exit_code(&result))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    // Nothing is loaded or analyzed without inputs.
    let inputs = match checked_inputs(&cli) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{}", Cli::usage());
            std::process::exit(e.exit_code());
        }
    };

    let code = match run(&cli, &inputs).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}
