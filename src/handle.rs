//! The per-invocation session.
//!
//! [`Handle`] owns everything one run of rbuild needs: the operator
//! interface, the merged configuration, the home directory, the
//! management-server facade and the cache of rendered consumer
//! configuration. Nothing here is global; commands receive the handle.

use std::env;

use log::debug;

use crate::cache::ConfigCache;
use crate::config::layers::{self, RemoteConfigSource};
use crate::config::writer::{self, Dialect, RenderedConfig};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::facade::transport::{Endpoint, HttpConnector, HttpRemoteConfig};
use crate::facade::RbuilderFacade;
use crate::home::{self, HomeDir};
use crate::ui::Ui;

pub struct Handle {
    pub(crate) ui: Box<dyn Ui>,
    pub(crate) config: Config,
    home: std::result::Result<HomeDir, String>,
    pub(crate) rbuilder: RbuilderFacade,
    consumer_configs: ConfigCache<Dialect, RenderedConfig>,
}

/// Connection details for the management server as configured.
pub fn endpoint_for(config: &Config) -> Endpoint {
    let url = config.server_url().unwrap_or_default();
    match config.user() {
        Some(user) => Endpoint::new(url, &user.name, user.password.clone().unwrap_or_default()),
        None => Endpoint::anonymous(url),
    }
}

impl Handle {
    /// Assemble a session from the process environment: `HOME`, the
    /// current directory, the rc files and the server's published
    /// configuration.
    pub fn from_environment(ui: Box<dyn Ui>) -> Result<Self> {
        let home = home::require_home().map_err(|err| err.to_string());
        let cwd = env::current_dir()?;
        let connector = HttpConnector::new();
        let remote: Box<dyn RemoteConfigSource> = Box::new(HttpRemoteConfig::new(&connector));
        let providers = layers::standard_providers(home.as_ref().ok(), &cwd, Some(remote));
        let config = layers::load(&providers)?;
        let rbuilder = RbuilderFacade::new(Box::new(connector), endpoint_for(&config));
        Ok(Self {
            ui,
            config,
            home,
            rbuilder,
            consumer_configs: ConfigCache::new(),
        })
    }

    /// Assemble a session from parts.
    pub fn new(
        ui: Box<dyn Ui>,
        config: Config,
        home: Option<HomeDir>,
        rbuilder: RbuilderFacade,
    ) -> Self {
        Self {
            ui,
            config,
            home: home.ok_or_else(|| "The HOME environment variable must be set".to_string()),
            rbuilder,
            consumer_configs: ConfigCache::new(),
        }
    }

    pub fn ui(&mut self) -> &mut dyn Ui {
        self.ui.as_mut()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the configuration. Cached consumer renderings are
    /// dropped.
    pub fn config_mut(&mut self) -> &mut Config {
        self.consumer_configs.invalidate();
        &mut self.config
    }

    pub fn rbuilder(&self) -> &RbuilderFacade {
        &self.rbuilder
    }

    /// The facade together with the UI, for operations that report as
    /// they go.
    pub fn rbuilder_and_ui(&mut self) -> (&RbuilderFacade, &mut dyn Ui) {
        (&self.rbuilder, self.ui.as_mut())
    }

    /// The home directory, or the reason there is none.
    pub fn require_home(&self) -> Result<HomeDir> {
        self.home.clone().map_err(|message| Error::Precondition { message })
    }

    /// The configuration as a consumer program would read it.
    pub fn consumer_config(&mut self, dialect: Dialect, use_cache: bool) -> Result<RenderedConfig> {
        let config = &self.config;
        self.consumer_configs.get_or_load(dialect, use_cache, || {
            debug!("rendering {:?} configuration", dialect);
            Ok(writer::render(config, dialect))
        })
    }

    /// Point the facade at the currently configured server and user.
    pub fn refresh_endpoint(&mut self) {
        let endpoint = endpoint_for(&self.config);
        self.rbuilder.set_endpoint(endpoint);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::facade::poller::testing::FakeClock;
    use crate::facade::transport::testing::FakeConnector;
    use crate::ui::testing::SharedUi;

    /// A handle wired to fakes.
    pub fn fake_handle(
        ui: &SharedUi,
        connector: &FakeConnector,
        config: Config,
        home: Option<HomeDir>,
    ) -> Handle {
        let rbuilder = RbuilderFacade::new(Box::new(connector.clone()), endpoint_for(&config))
            .with_clock(Box::new(FakeClock::new(0, 0)));
        Handle::new(ui.boxed(), config, home, rbuilder)
    }
}
