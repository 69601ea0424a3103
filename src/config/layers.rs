//! Layer providers and the loader that folds them.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::rcfile::{layer_from_entries, parse_entries, read_layer, INCLUDE_DIRECTIVE};
use super::{Config, Layer, LayerSource, OptionValue};
use crate::error::Result;
use crate::home::HomeDir;

/// System-wide rc file.
pub const SYSTEM_RC: &str = "/etc/rbuildrc";
/// Per-user rc file, relative to the home directory.
pub const USER_RC: &str = ".rbuildrc";
/// Per-directory rc file, relative to the working directory.
pub const LOCAL_RC: &str = "rbuildrc";

/// Hosts whose published client configuration is never merged.
const PUBLIC_HOSTS: &[&str] = &["www.rpath.com", "www.rpath.org"];

/// Options a published client configuration may not set.
const REMOTE_EXCLUDED: &[&str] = &["user", "rmakeUser", "serverUrl"];

/// A source of one configuration layer.
///
/// `merged` is everything folded so far, so a provider can depend on lower
/// layers (the remote layer needs `serverUrl`).
pub trait LayerProvider {
    fn source(&self) -> LayerSource;
    fn provide(&self, merged: &Config) -> Result<Layer>;
}

/// Fetches text published by the management server.
pub trait RemoteConfigSource {
    /// `Ok(None)` when the server has nothing at `url`.
    fn fetch(&self, url: &str) -> Result<Option<String>>;
}

/// The built-in defaults.
pub struct BuiltinDefaults {
    home: Option<HomeDir>,
}

impl BuiltinDefaults {
    pub fn new(home: Option<HomeDir>) -> Self {
        Self { home }
    }
}

impl LayerProvider for BuiltinDefaults {
    fn source(&self) -> LayerSource {
        LayerSource::Default
    }

    fn provide(&self, _merged: &Config) -> Result<Layer> {
        let mut layer = Layer::new(LayerSource::Default);
        let user_plugins = match &self.home {
            Some(home) => home.expand("~/.rbuild/plugins.d").display().to_string(),
            None => "~/.rbuild/plugins.d".to_string(),
        };
        layer.set(
            "pluginDirs",
            OptionValue::List(vec!["/usr/share/rbuild/plugins".to_string(), user_plugins]),
        )?;
        layer.set("externalPassword", OptionValue::Bool(false))?;
        Ok(layer)
    }
}

/// One rc file on disk.
pub struct RcFileLayer {
    path: PathBuf,
    source: LayerSource,
    home: Option<HomeDir>,
}

impl RcFileLayer {
    pub fn new(path: impl Into<PathBuf>, source: LayerSource, home: Option<HomeDir>) -> Self {
        Self {
            path: path.into(),
            source,
            home,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayerProvider for RcFileLayer {
    fn source(&self) -> LayerSource {
        self.source
    }

    fn provide(&self, _merged: &Config) -> Result<Layer> {
        read_layer(&self.path, self.source, self.home.as_ref())
    }
}

/// The client configuration published at `<serverUrl>/conaryrc`.
pub struct RemoteLayer {
    fetcher: Box<dyn RemoteConfigSource>,
}

impl RemoteLayer {
    pub fn new(fetcher: Box<dyn RemoteConfigSource>) -> Self {
        Self { fetcher }
    }
}

impl LayerProvider for RemoteLayer {
    fn source(&self) -> LayerSource {
        LayerSource::Remote
    }

    fn provide(&self, merged: &Config) -> Result<Layer> {
        let empty = Layer::new(LayerSource::Remote);
        let Some(server_url) = merged.server_url() else {
            return Ok(empty);
        };
        if let Some(host) = merged.server_host() {
            if PUBLIC_HOSTS.contains(&host.as_str()) {
                debug!("Not merging published configuration from {}", host);
                return Ok(empty);
            }
        }
        let url = format!("{}/conaryrc", server_url.trim_end_matches('/'));
        let content = match self.fetcher.fetch(&url) {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(empty),
            Err(err) => {
                warn!("Could not read {}: {}", url, err);
                return Ok(empty);
            }
        };
        // includes in published text would name paths on this machine
        let entries: Vec<_> = parse_entries(&content)
            .into_iter()
            .filter(|entry| {
                if entry.key.eq_ignore_ascii_case(INCLUDE_DIRECTIVE) {
                    debug!("Ignoring include of {} from {}", entry.value, url);
                    return false;
                }
                !REMOTE_EXCLUDED
                    .iter()
                    .any(|key| key.eq_ignore_ascii_case(&entry.key))
            })
            .collect();
        Ok(layer_from_entries(&entries, LayerSource::Remote, &url))
    }
}

/// Answers given during this session, applied last.
pub struct InteractiveLayer {
    layer: Layer,
}

impl InteractiveLayer {
    pub fn new(layer: Layer) -> Self {
        Self { layer }
    }
}

impl LayerProvider for InteractiveLayer {
    fn source(&self) -> LayerSource {
        LayerSource::Interactive
    }

    fn provide(&self, _merged: &Config) -> Result<Layer> {
        Ok(self.layer.clone())
    }
}

/// The standard provider chain for a session.
pub fn standard_providers(
    home: Option<&HomeDir>,
    cwd: &Path,
    remote: Option<Box<dyn RemoteConfigSource>>,
) -> Vec<Box<dyn LayerProvider>> {
    let mut providers: Vec<Box<dyn LayerProvider>> = vec![
        Box::new(BuiltinDefaults::new(home.cloned())),
        Box::new(RcFileLayer::new(SYSTEM_RC, LayerSource::System, home.cloned())),
    ];
    if let Some(home) = home {
        providers.push(Box::new(RcFileLayer::new(
            home.file(USER_RC),
            LayerSource::User,
            Some(home.clone()),
        )));
    }
    providers.push(Box::new(RcFileLayer::new(
        cwd.join(LOCAL_RC),
        LayerSource::Local,
        home.cloned(),
    )));
    if let Some(remote) = remote {
        providers.push(Box::new(RemoteLayer::new(remote)));
    }
    providers
}

/// Fold every provider's layer, lowest precedence first.
pub fn load(providers: &[Box<dyn LayerProvider>]) -> Result<Config> {
    let mut ordered: Vec<&Box<dyn LayerProvider>> = providers.iter().collect();
    ordered.sort_by_key(|provider| provider.source());
    ordered.into_iter().try_fold(Config::default(), |mut config, provider| {
        let layer = provider.provide(&config)?;
        debug!("{} layer supplied {} option(s)", provider.source(), layer.len());
        config.apply(layer);
        Ok(config)
    })
}
