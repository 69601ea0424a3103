//! # rbuild CLI
//!
//! Binary entry point for the `rbuild` command-line tool.
//!
//! Argument parsing and dispatch live in [`cli`]; each subcommand is a
//! thin module under [`commands`] calling into the `rbuild` library. Any
//! error that reaches this point is printed once and turned into exit
//! status 1. Usage errors exit with 2 through `clap`.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
