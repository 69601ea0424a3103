//! # Config Command Implementation
//!
//! `rbuild config` prints the merged configuration. With `--ask` it reruns
//! the questionnaire and rewrites every file; `--conaryrc` and `--rmakerc`
//! regenerate the consumer files from the current configuration.

use anyhow::Result;
use clap::Args;

use rbuild::handle::Handle;
use rbuild::plugins::config as workflow;
use rbuild::ui::{OutputConfig, TerminalUi};

/// Print the rbuild configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// (Re)run interactive config questionnaire; write all configuration files
    #[arg(long)]
    pub ask: bool,

    /// Re-write ~/.conaryrc-rbuild
    #[arg(long)]
    pub conaryrc: bool,

    /// Re-write ~/.rmakerc-rbuild
    #[arg(long)]
    pub rmakerc: bool,

    /// Show passwords instead of <password>
    #[arg(long)]
    pub show_passwords: bool,
}

pub fn execute(args: ConfigArgs, output: OutputConfig) -> Result<()> {
    let mut handle = Handle::from_environment(Box::new(TerminalUi::new(output)))?;

    if args.ask {
        // --ask writes the consumer files itself
        workflow::update_config(&mut handle)?;
    } else if args.conaryrc || args.rmakerc {
        if args.conaryrc {
            workflow::write_repository_client_configuration(&mut handle)?;
        }
        if args.rmakerc {
            workflow::write_build_client_configuration(&mut handle)?;
        }
    } else {
        workflow::display_config(&mut handle, !args.show_passwords);
    }
    Ok(())
}
