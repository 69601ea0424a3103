//! # Images Command Implementation
//!
//! ## Subcommands
//!
//! - **`watch`**: poll image builds until they finish or `--timeout` elapses
//! - **`status`**: print the current status of each build once

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use rbuild::facade::WatchOptions;
use rbuild::handle::Handle;
use rbuild::plugins::config::ensure_config;
use rbuild::ui::{OutputConfig, TerminalUi};

/// Watch or show the status of image builds
#[derive(Args, Debug)]
pub struct ImagesArgs {
    #[command(subcommand)]
    pub command: ImagesSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ImagesSubcommand {
    /// Wait for builds to finish, reporting each status change
    Watch(WatchArgs),
    /// Show the current status of builds
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Build ids to watch
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<u64>,

    /// Seconds between polling rounds
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    pub interval: u64,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Build ids to show
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<u64>,
}

pub fn execute(args: ImagesArgs, output: OutputConfig) -> Result<()> {
    let mut handle = Handle::from_environment(Box::new(TerminalUi::new(output)))?;
    ensure_config(&mut handle)?;
    let (rbuilder, ui) = handle.rbuilder_and_ui();

    match args.command {
        ImagesSubcommand::Watch(watch) => {
            let options = WatchOptions::new(watch.interval, watch.timeout);
            let report = rbuilder.watch_images(&watch.ids, options, ui)?;
            if report.timed_out {
                bail!(
                    "{} of {} build(s) still running",
                    report.unresolved.len(),
                    watch.ids.len()
                );
            }
        }
        ImagesSubcommand::Status(status) => {
            rbuilder.show_image_status(&status.ids, ui)?;
        }
    }
    Ok(())
}
