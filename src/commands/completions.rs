//! # Completions Command Implementation
//!
//! `rbuild completions <shell>` prints a completion script on stdout,
//! covering nested subcommands such as `images watch`.
//!
//! ```bash
//! rbuild completions bash > ~/.local/share/bash-completion/completions/rbuild
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Print a completion script for rbuild
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut io::stdout())
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut out = Vec::new();
        write_completions(shell, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_bash_script_covers_nested_subcommands() {
        let text = script(Shell::Bash);
        assert!(text.contains("_rbuild()"));
        assert!(text.contains("images"));
        assert!(text.contains("watch"));
        assert!(text.contains("--conaryrc"));
    }

    #[test]
    fn test_every_shell_renders() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            assert!(!script(shell).is_empty(), "{}", shell);
        }
    }
}
