//! CLI argument parsing via `clap`.

use crate::error::CliError;
use clap::{CommandFactory, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "lintrun",
    version,
    about = "Run the linter over a list of inputs",
    long_about = "lintrun — analyze files or directories one at a time, print their warnings, and exit non-zero when anything fatal was found.\n\nConfiguration precedence: CLI > lintrun.toml > defaults.",
    after_help = "Examples:\n  lintrun app/x-foo.html\n  lintrun --root app --policy policy.json -i x-foo.html x-bar.html\n  lintrun --output json elements/"
)]
/// Command-line options.
pub struct Cli {
    #[arg(short = 'b', long, value_name = "DIR", help = "Dependency directory name (default: bower_components)")]
    pub bowerdir: Option<String>,

    #[arg(short, long, action = clap::ArgAction::SetTrue, help = "Print progress information")]
    pub verbose: bool,

    #[arg(short = 'g', long, action = clap::ArgAction::SetTrue, help = "Print debug logging")]
    pub debug: bool,

    #[arg(short, long, value_name = "PATH", help = "Policy file (JSON, TOML or YAML)")]
    pub policy: Option<String>,

    #[arg(short, long, value_name = "PATH", help = "Base path for resolving inputs and imports")]
    pub root: Option<String>,

    #[arg(short, long = "input", value_name = "PATHS", num_args = 1.., help = "Files or directories to analyze")]
    pub input: Vec<String>,

    #[arg(value_name = "INPUTS", help = "Files or directories to analyze")]
    pub paths: Vec<String>,

    #[arg(long, value_name = "MODE", help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,

    #[arg(long, value_name = "PATH", help = "Config file (default: discover lintrun.toml)")]
    pub config: Option<String>,
}

impl Cli {
    /// Inputs in the order given: `--input` values first, then positionals.
    pub fn inputs(&self) -> Vec<String> {
        self.input.iter().chain(self.paths.iter()).cloned().collect()
    }

    /// Usage text printed when no input is given.
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }
}

/// The inputs to analyze, or [`CliError::Usage`] when none were given.
pub fn checked_inputs(cli: &Cli) -> Result<Vec<String>, CliError> {
    let inputs = cli.inputs();
    if inputs.is_empty() {
        return Err(CliError::Usage);
    }
    Ok(inputs)
}
