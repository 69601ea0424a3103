//! # Config Writer
//!
//! Writes rbuild's own rc file and the managed configuration files of the
//! two consumers, the repository client and the build-service client.
//!
//! Each consumer gets a pair of files:
//!
//! - a **managed** file (`~/.conaryrc-rbuild`, `~/.rmakerc-rbuild`) that is
//!   rewritten on every run and only ever contains the keys on that
//!   consumer's allow-list;
//! - a **stub** (`~/.conaryrc`, `~/.rmakerc`) that includes the managed file.
//!   The stub is only created when absent; an existing one is left alone.
//!
//! Every file is created with owner-only permissions since it may carry a
//! password.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{Config, LayerSource, OptionValue};
use crate::error::Result;
use crate::home::HomeDir;

/// Keys the repository client may receive.
pub const REPOSITORY_CLIENT_KEYS: &[&str] = &["contact", "name", "user", "repositoryMap"];

/// Keys the build-service client may receive.
pub const BUILD_CLIENT_KEYS: &[&str] = &["rmakeUser", "rmakeUrl", "rbuilderUrl"];

pub const RBUILD_HEADER: &str =
    "# This file will be overwritten by the \"rbuild config --ask\" command";

pub const REPOSITORY_CLIENT_HEADER: &str = "# This file will be overwritten automatically by rBuild\n\
# You can ignore it by removing the associated includeConfigFile\n\
# line from ~/.conaryrc";

pub const BUILD_CLIENT_HEADER: &str = "# This file will be overwritten automatically by rBuild.\n\
# You can ignore it by removing the associated includeConfigFile\n\
# line from ~/.rmakerc";

pub const REPOSITORY_CLIENT_STUB: &str =
    "# Include config file maintained by rBuild:\nincludeConfigFile ~/.conaryrc-rbuild";

pub const BUILD_CLIENT_STUB: &str =
    "# Include config file maintained by rBuild:\nincludeConfigFile ~/.rmakerc-rbuild";

/// Configuration rendered in one consumer's dialect: key to value lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedConfig {
    entries: BTreeMap<String, Vec<String>>,
}

impl RenderedConfig {
    pub fn push(&mut self, key: impl Into<String>, line: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(line.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn lines(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Render as rc text, sorted by key, keeping only `allowed` keys when
    /// an allow-list is given.
    pub fn to_text(&self, allowed: Option<&[&str]>) -> String {
        let mut out = String::new();
        for (key, lines) in &self.entries {
            if let Some(allowed) = allowed {
                if !allowed.contains(&key.as_str()) {
                    continue;
                }
            }
            for line in lines {
                out.push_str(&format!("{:<25} {}\n", key, line));
            }
        }
        out
    }
}

/// Which program a rendering is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Rbuild,
    RepositoryClient,
    BuildClient,
}

/// Render the whole configuration in `dialect`. Filtering happens when
/// the result is written.
pub fn render(config: &Config, dialect: Dialect) -> RenderedConfig {
    let mut rendered = RenderedConfig::default();
    let external = config.external_password();
    for (key, value) in config.iter() {
        match (dialect, value) {
            (Dialect::RepositoryClient, OptionValue::User(cred)) if key == "user" => {
                // the repository client's user lines are scoped by host glob
                let line = match (&cred.password, external) {
                    (Some(password), false) => format!("* {} {}", cred.name, password),
                    _ => format!("* {}", cred.name),
                };
                rendered.push(key, line);
            }
            (Dialect::BuildClient, OptionValue::User(cred)) if external => {
                if key != "rmakeUser" {
                    rendered.push(key, cred.name.clone());
                }
            }
            _ => {
                for line in value.rc_lines() {
                    rendered.push(key, line);
                }
            }
        }
    }
    if dialect == Dialect::BuildClient {
        if external {
            // with an external password store the build client logs in as
            // the repository user
            if let Some(user) = config.user() {
                rendered.push("rmakeUser", user.name.clone());
            }
        }
        if let Some(url) = config.server_url() {
            rendered.push("rbuilderUrl", url);
        }
        if config.rmake_url().is_none() {
            if let Some(url) = config.effective_rmake_url() {
                rendered.push("rmakeUrl", url);
            }
        }
    }
    rendered
}

/// One file rbuild is responsible for.
#[derive(Debug, Clone)]
pub struct ManagedFile<'a> {
    pub path: PathBuf,
    pub header: &'a str,
    pub keys: Option<&'a [&'a str]>,
    pub replace_existing: bool,
}

impl ManagedFile<'_> {
    /// Write `contents` (or just the header when `None`).
    ///
    /// Returns `false` without touching the file when it exists and
    /// `replace_existing` is off.
    pub fn write(&self, contents: Option<&RenderedConfig>) -> Result<bool> {
        if !self.replace_existing && self.path.exists() {
            debug!("Leaving existing {} alone", self.path.display());
            return Ok(false);
        }
        let mut file = create_private(&self.path)?;
        writeln!(file, "{}", self.header)?;
        if let Some(contents) = contents {
            file.write_all(contents.to_text(self.keys).as_bytes())?;
        }
        file.flush()?;
        info!("Wrote {}", self.path.display());
        Ok(true)
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies at creation; tighten files that already existed
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Write `~/.rbuildrc` with the values the operator owns.
///
/// Built-in defaults and values published by the server are left out so
/// they keep tracking their source.
pub fn write_rbuild_configuration(home: &HomeDir, config: &Config) -> Result<bool> {
    let owned = config.layer_from(
        |source| !matches!(source, LayerSource::Default | LayerSource::Remote),
        LayerSource::User,
    );
    let rendered = render(&Config::merge([owned]), Dialect::Rbuild);
    ManagedFile {
        path: home.file(".rbuildrc"),
        header: RBUILD_HEADER,
        keys: None,
        replace_existing: true,
    }
    .write(Some(&rendered))
}

/// Write the repository client's managed file and, if missing, its stub.
pub fn write_repository_client_configuration(
    home: &HomeDir,
    rendered: &RenderedConfig,
) -> Result<()> {
    write_pair(
        home,
        ".conaryrc-rbuild",
        REPOSITORY_CLIENT_HEADER,
        REPOSITORY_CLIENT_KEYS,
        ".conaryrc",
        REPOSITORY_CLIENT_STUB,
        rendered,
    )
}

/// Write the build-service client's managed file and, if missing, its stub.
pub fn write_build_client_configuration(home: &HomeDir, rendered: &RenderedConfig) -> Result<()> {
    write_pair(
        home,
        ".rmakerc-rbuild",
        BUILD_CLIENT_HEADER,
        BUILD_CLIENT_KEYS,
        ".rmakerc",
        BUILD_CLIENT_STUB,
        rendered,
    )
}

fn write_pair(
    home: &HomeDir,
    managed: &str,
    header: &str,
    keys: &[&str],
    stub: &str,
    stub_header: &str,
    rendered: &RenderedConfig,
) -> Result<()> {
    ManagedFile {
        path: home.file(managed),
        header,
        keys: Some(keys),
        replace_existing: true,
    }
    .write(Some(rendered))?;
    ManagedFile {
        path: home.file(stub),
        header: stub_header,
        keys: None,
        replace_existing: false,
    }
    .write(None)?;
    Ok(())
}
