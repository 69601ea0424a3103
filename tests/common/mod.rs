//! Shared test utilities for E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_complete_config();
//!     fixture.command().arg("config").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// `.rbuildrc` snippets.
#[allow(dead_code)]
pub mod configs {
    /// Everything the questionnaire would ask for. The server address
    /// refuses connections so nothing waits on the network.
    pub const COMPLETE: &str = "\
serverUrl http://127.0.0.1:1
user bob secret
name Bob Builder
contact bob@example.com
";

    /// A server but no identity.
    pub const SERVER_ONLY: &str = "serverUrl http://127.0.0.1:1\n";
}

/// A temporary home directory and a separate working directory.
pub struct TestFixture {
    home: assert_fs::TempDir,
    work: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            home: assert_fs::TempDir::new().expect("Failed to create home directory"),
            work: assert_fs::TempDir::new().expect("Failed to create work directory"),
        }
    }

    /// Write `~/.rbuildrc`.
    pub fn with_rbuildrc(self, content: &str) -> Self {
        self.home
            .child(".rbuildrc")
            .write_str(content)
            .expect("Failed to write .rbuildrc");
        self
    }

    #[allow(dead_code)]
    pub fn with_complete_config(self) -> Self {
        self.with_rbuildrc(configs::COMPLETE)
    }

    /// Add a file under the home directory.
    #[allow(dead_code)]
    pub fn with_home_file(self, path: &str, content: &str) -> Self {
        self.home
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    #[allow(dead_code)]
    pub fn work(&self) -> &Path {
        self.work.path()
    }

    /// Read a file under the home directory.
    #[allow(dead_code)]
    pub fn read_home_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.home.path().join(path)).expect("Failed to read file")
    }

    /// A command with `HOME` pointed at the fixture and the working
    /// directory set to the fixture's work directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("rbuild");
        cmd.current_dir(self.work.path())
            .env("HOME", self.home.path())
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_separate_dirs() {
        let fixture = TestFixture::new();
        assert!(fixture.home().exists());
        assert!(fixture.work().exists());
        assert_ne!(fixture.home(), fixture.work());
    }

    #[test]
    fn test_fixture_with_rbuildrc() {
        let fixture = TestFixture::new().with_complete_config();
        assert!(fixture.read_home_file(".rbuildrc").contains("serverUrl"));
    }
}
