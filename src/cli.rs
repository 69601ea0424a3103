//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;
use rbuild::ui::OutputConfig;

/// rBuild - configure and drive rBuilder product builds
#[derive(Parser, Debug)]
#[command(name = "rbuild")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the rbuild configuration, or rerun the questionnaire
    Config(commands::config::ConfigArgs),

    /// Watch or show the status of image builds
    Images(commands::images::ImagesArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Config(args) => commands::config::execute(args, output),
            Commands::Images(args) => commands::images::execute(args, output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Warn);
    let mut builder = env_logger::Builder::new();
    builder.filter_level(filter).format_timestamp(None);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    // a logger may already be installed when embedded
    let _ = builder.try_init();
}
