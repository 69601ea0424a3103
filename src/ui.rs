//! # Operator Interaction
//!
//! Everything rbuild says to or asks of the operator goes through the
//! [`Ui`] trait. The terminal implementation is built on `dialoguer` and
//! `console`; tests drive the same code with a scripted implementation.
//!
//! ## Color
//!
//! [`OutputConfig`] decides whether styled output is used, respecting:
//! - `--color=never|always|auto`
//! - `NO_COLOR` (per https://no-color.org/)
//! - `CLICOLOR=0` and `CLICOLOR_FORCE=1`
//! - `TERM=dumb`

use std::env;

use console::style;
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Confirm, Input, Password};

use crate::error::Result;

/// Validates a typed answer, returning the message to show on rejection.
pub type Validator<'a> = &'a dyn Fn(&str) -> std::result::Result<(), String>;

/// Prompts and messages.
pub trait Ui {
    /// Plain output on stdout.
    fn write(&mut self, message: &str);

    fn info(&mut self, message: &str);

    fn warning(&mut self, message: &str);

    fn error(&mut self, message: &str);

    /// Ask for a line of text. Re-asks until `validate` accepts the answer.
    /// An empty answer selects `default` when there is one.
    fn get_response(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validate: Option<Validator<'_>>,
    ) -> Result<String>;

    /// Ask for a password without echo, optionally asking twice.
    fn get_password(&mut self, prompt: &str, default: Option<&str>, verify: bool) -> Result<String>;

    /// Ask a yes/no question.
    fn get_yn(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag against the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The interactive terminal.
pub struct TerminalUi {
    output: OutputConfig,
    theme: Box<dyn Theme>,
}

impl TerminalUi {
    pub fn new(output: OutputConfig) -> Self {
        let theme: Box<dyn Theme> = if output.use_color {
            Box::new(ColorfulTheme::default())
        } else {
            Box::new(SimpleTheme)
        };
        Self { output, theme }
    }
}

impl Ui for TerminalUi {
    fn write(&mut self, message: &str) {
        println!("{}", message);
    }

    fn info(&mut self, message: &str) {
        println!("{}", message);
    }

    fn warning(&mut self, message: &str) {
        if self.output.use_color {
            eprintln!("{} {}", style("warning:").yellow().bold(), message);
        } else {
            eprintln!("warning: {}", message);
        }
    }

    fn error(&mut self, message: &str) {
        if self.output.use_color {
            eprintln!("{} {}", style("error:").red().bold(), message);
        } else {
            eprintln!("error: {}", message);
        }
    }

    fn get_response(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validate: Option<Validator<'_>>,
    ) -> Result<String> {
        let mut input = Input::<String>::with_theme(self.theme.as_ref()).with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        if let Some(validate) = validate {
            input = input.validate_with(move |answer: &String| validate(answer.as_str()));
        }
        Ok(input.interact_text()?.trim().to_string())
    }

    fn get_password(&mut self, prompt: &str, default: Option<&str>, verify: bool) -> Result<String> {
        let mut password = Password::with_theme(self.theme.as_ref())
            .with_prompt(prompt)
            .allow_empty_password(default.is_some());
        if verify {
            password = password.with_confirmation("Retype password", "Passwords do not match");
        }
        let answer = password.interact()?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn get_yn(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(self.theme.as_ref())
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Answer, Level, ScriptedUi};
    use super::*;

    #[test]
    fn test_color_always() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
    }

    #[test]
    fn test_color_never() {
        assert!(!OutputConfig::from_env_and_flag("never").use_color);
    }

    #[test]
    fn test_scripted_response_revalidates() {
        let mut ui = ScriptedUi::new(vec![
            ScriptedUi::text("bad"),
            ScriptedUi::text(""),
        ]);
        let validate = |answer: &str| {
            if answer == "bad" {
                Err(format!("rejected {}", answer))
            } else {
                Ok(())
            }
        };
        let answer = ui
            .get_response("Pick", Some("fallback"), Some(&validate))
            .unwrap();
        assert_eq!(answer, "fallback");
        assert_eq!(ui.lines(Level::Error), vec!["rejected bad"]);
        assert_eq!(ui.prompts.len(), 2);
    }

    #[test]
    fn test_scripted_yn_default() {
        let mut ui = ScriptedUi::new(vec![ScriptedUi::text(""), Answer::Yn(false)]);
        assert!(ui.get_yn("Sure?", true).unwrap());
        assert!(!ui.get_yn("Sure?", true).unwrap());
        assert_eq!(ui.remaining(), 0);
    }
}
