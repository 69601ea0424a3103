//! Locating the operator's home directory.
//!
//! Anything that reads or writes per-user rc files goes through
//! [`require_home`] first. A missing or dangling `HOME` is fatal.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The operator's home directory, checked to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeDir(PathBuf);

impl HomeDir {
    /// Wrap an already-validated directory.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(Error::Precondition {
                message: format!(
                    "The HOME environment variable references \"{}\" which does not exist",
                    path.display()
                ),
            });
        }
        Ok(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Path of a dotfile directly under the home directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }

    /// Expand a leading `~/` against this home directory.
    pub fn expand(&self, path: &str) -> PathBuf {
        match path.strip_prefix("~/") {
            Some(rest) => self.0.join(rest),
            None if path == "~" => self.0.clone(),
            None => PathBuf::from(path),
        }
    }
}

/// Read `HOME` from the environment and make sure it points at a directory.
pub fn require_home() -> Result<HomeDir> {
    match env::var_os("HOME") {
        Some(home) if !home.is_empty() => HomeDir::new(PathBuf::from(home)),
        _ => Err(Error::Precondition {
            message: "The HOME environment variable must be set".to_string(),
        }),
    }
}
