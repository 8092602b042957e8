//! wavesense CLI: lists and runs verification scenarios against the
//! behavioral baseband pipeline models.
//!
//! `wavesense list` shows the scenario catalog and `wavesense run` executes
//! scenarios and prints one verdict per scenario plus a summary line.

#![warn(missing_docs)]

mod list;
mod logging;
mod run;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use wavesense_config::{WavesenseConfig, CONFIG_FILE};

/// Exit code when every scenario passed.
pub const EXIT_PASS: i32 = 0;
/// Exit code when at least one scenario failed.
pub const EXIT_FAIL: i32 = 1;
/// Exit code for configuration and usage errors.
pub const EXIT_ERROR: i32 = 2;

/// wavesense: verification harness for a pipelined OFDM baseband.
#[derive(Parser, Debug)]
#[command(name = "wavesense", version, about = "Baseband pipeline verification harness")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a `wavesense.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available scenarios.
    List,
    /// Run scenarios.
    Run(RunArgs),
}

/// Arguments for `wavesense run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario names to run; every enabled scenario when omitted.
    pub names: Vec<String>,

    /// Seed for every scenario, replacing configured seeds.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Waveform output, replacing `harness.waveform`.
    #[arg(long, value_enum)]
    pub waveform: Option<WaveformArg>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Waveform output selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WaveformArg {
    /// Value Change Dump (IEEE 1364).
    Vcd,
    /// No waveform.
    None,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON on stdout.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Verbosity level from repeated `-v`.
    pub verbose: u8,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// The configuration file to read.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Loads the configuration and returns it with the directory relative
    /// paths in it are resolved against.
    pub fn load_config(&self) -> Result<(WavesenseConfig, PathBuf), wavesense_config::ConfigError> {
        let path = self.config_path();
        let config = wavesense_config::load_config(&path)?;
        Ok((config, base_dir(&path)))
    }
}

fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    logging::init(&global);

    let result = match cli.command {
        Command::List => list::run(&global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(EXIT_ERROR);
        }
    }
}
