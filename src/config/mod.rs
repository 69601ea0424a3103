//! # Configuration Store
//!
//! The merged view of rbuild's configuration. Options come from a fixed
//! schema ([`OPTIONS`]) and arrive in [`Layer`]s; [`Config::merge`] folds
//! the layers in precedence order where the last non-empty value wins.
//!
//! ## Layer Order
//!
//! 1. Built-in defaults
//! 2. `/etc/rbuildrc`
//! 3. `~/.rbuildrc`
//! 4. `./rbuildrc`
//! 5. The management server's published client configuration
//! 6. Values answered interactively during this session
//!
//! The order is total: [`LayerSource`] derives `Ord` and the loader sorts
//! providers by it, so a later source always overrides an earlier one for
//! any key both of them set.

pub mod base;
pub mod layers;
pub mod rcfile;
pub mod writer;

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// Port the build service listens on next to the management server.
pub const RMAKE_PORT: u16 = 9999;

/// A user name with an optional password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub password: Option<String>,
}

impl Credential {
    pub fn new(name: impl Into<String>, password: Option<String>) -> Self {
        Self {
            name: name.into(),
            password,
        }
    }

    /// The same user with the password removed.
    pub fn without_password(&self) -> Self {
        Self {
            name: self.name.clone(),
            password: None,
        }
    }
}

/// The shape of an option's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    List,
    User,
    Dict,
    Bool,
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    List(Vec<String>),
    User(Credential),
    Dict(BTreeMap<String, String>),
    Bool(bool),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::String(_) => OptionKind::String,
            OptionValue::List(_) => OptionKind::List,
            OptionValue::User(_) => OptionKind::User,
            OptionValue::Dict(_) => OptionKind::Dict,
            OptionValue::Bool(_) => OptionKind::Bool,
        }
    }

    /// Empty values never override a lower layer. A boolean is always set.
    pub fn is_empty(&self) -> bool {
        match self {
            OptionValue::String(s) => s.is_empty(),
            OptionValue::List(items) => items.is_empty(),
            OptionValue::User(cred) => cred.name.is_empty(),
            OptionValue::Dict(map) => map.is_empty(),
            OptionValue::Bool(_) => false,
        }
    }

    /// Fold one rc-file line into a value of `kind`.
    ///
    /// Scalars replace whatever came before; lists and dicts accumulate
    /// across lines within the same layer.
    pub fn parse_line(kind: OptionKind, previous: Option<OptionValue>, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match kind {
            OptionKind::String => Ok(OptionValue::String(raw.to_string())),
            OptionKind::List => {
                let mut items = match previous {
                    Some(OptionValue::List(items)) => items,
                    _ => Vec::new(),
                };
                items.extend(raw.split_whitespace().map(str::to_string));
                Ok(OptionValue::List(items))
            }
            OptionKind::User => {
                let (name, password) = split_first_word(raw);
                Ok(OptionValue::User(Credential::new(
                    name,
                    password.map(str::to_string),
                )))
            }
            OptionKind::Dict => {
                let mut map = match previous {
                    Some(OptionValue::Dict(map)) => map,
                    _ => BTreeMap::new(),
                };
                match split_first_word(raw) {
                    (key, Some(value)) if !key.is_empty() => {
                        map.insert(key.to_string(), value.to_string());
                        Ok(OptionValue::Dict(map))
                    }
                    _ => Err(Error::validation("mapping entry", raw)),
                }
            }
            OptionKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(OptionValue::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(OptionValue::Bool(false)),
                _ => Err(Error::validation("boolean", raw)),
            },
        }
    }

    /// The value as it is written after the key in an rc file, one entry
    /// per output line.
    pub fn rc_lines(&self) -> Vec<String> {
        match self {
            OptionValue::String(s) => vec![s.clone()],
            OptionValue::List(items) => vec![items.join(" ")],
            OptionValue::User(cred) => vec![render_credential(cred, false)],
            OptionValue::Dict(map) => map.iter().map(|(k, v)| format!("{} {}", k, v)).collect(),
            OptionValue::Bool(b) => vec![if *b { "True" } else { "False" }.to_string()],
        }
    }

    fn display_lines(&self, hide_passwords: bool) -> Vec<String> {
        match self {
            OptionValue::User(cred) => vec![render_credential(cred, hide_passwords)],
            other => other.rc_lines(),
        }
    }
}

fn render_credential(cred: &Credential, hide_password: bool) -> String {
    match &cred.password {
        Some(_) if hide_password => format!("{} <password>", cred.name),
        Some(password) => format!("{} {}", cred.name, password),
        None => cred.name.clone(),
    }
}

pub(crate) fn split_first_word(raw: &str) -> (&str, Option<&str>) {
    let raw = raw.trim();
    match raw.split_once(char::is_whitespace) {
        Some((first, rest)) => {
            let rest = rest.trim();
            (first, if rest.is_empty() { None } else { Some(rest) })
        }
        None => (raw, None),
    }
}

/// Every option rbuild understands, with its value shape.
pub const OPTIONS: &[(&str, OptionKind)] = &[
    ("serverUrl", OptionKind::String),
    ("user", OptionKind::User),
    ("name", OptionKind::String),
    ("contact", OptionKind::String),
    ("pluginDirs", OptionKind::List),
    ("rmakeUrl", OptionKind::String),
    ("rmakeUser", OptionKind::User),
    ("repositoryMap", OptionKind::Dict),
    ("externalPassword", OptionKind::Bool),
    ("recipeTemplate", OptionKind::String),
    ("groupTemplate", OptionKind::String),
    ("factoryTemplate", OptionKind::String),
    ("recipeTemplateDirs", OptionKind::List),
    ("signatureKey", OptionKind::String),
];

/// Resolve an option name case-insensitively to its canonical spelling.
pub fn canonical_name(name: &str) -> Option<(&'static str, OptionKind)> {
    OPTIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .copied()
}

/// Where a layer's values came from, in increasing precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerSource {
    Default,
    System,
    User,
    Local,
    Remote,
    Interactive,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerSource::Default => "default",
            LayerSource::System => "system",
            LayerSource::User => "user",
            LayerSource::Local => "local",
            LayerSource::Remote => "remote",
            LayerSource::Interactive => "interactive",
        };
        f.write_str(name)
    }
}

/// A partial set of option values from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    source: LayerSource,
    values: BTreeMap<&'static str, OptionValue>,
}

impl Layer {
    pub fn new(source: LayerSource) -> Self {
        Self {
            source,
            values: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> LayerSource {
        self.source
    }

    /// Set `name` to `value`, checking the name and value shape against
    /// the schema.
    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<()> {
        let (canonical, kind) =
            canonical_name(name).ok_or_else(|| Error::validation("option", name))?;
        if value.kind() != kind {
            return Err(Error::validation(format!("value for {}", canonical), format!("{:?}", value)));
        }
        self.values.insert(canonical, value);
        Ok(())
    }

    /// Parse one rc line for `name` into this layer.
    pub fn set_line(&mut self, name: &str, raw: &str) -> Result<()> {
        let (canonical, kind) =
            canonical_name(name).ok_or_else(|| Error::validation("option", name))?;
        let previous = self.values.remove(canonical);
        let value = OptionValue::parse_line(kind, previous, raw)?;
        self.values.insert(canonical, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        canonical_name(name).and_then(|(canonical, _)| self.values.get(canonical))
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        canonical_name(name).and_then(|(canonical, _)| self.values.remove(canonical))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// The merged configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<&'static str, OptionValue>,
    sources: BTreeMap<&'static str, LayerSource>,
}

impl Config {
    /// Fold `layers` in order. The last non-empty value for each key wins.
    pub fn merge(layers: impl IntoIterator<Item = Layer>) -> Self {
        layers.into_iter().fold(Config::default(), |mut config, layer| {
            config.apply(layer);
            config
        })
    }

    /// Apply one more layer on top of the current values.
    pub fn apply(&mut self, layer: Layer) {
        let source = layer.source;
        for (key, value) in layer.values {
            if value.is_empty() {
                continue;
            }
            self.values.insert(key, value);
            self.sources.insert(key, source);
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        canonical_name(name).and_then(|(canonical, _)| self.values.get(canonical))
    }

    /// Which layer supplied the current value of `name`.
    pub fn source(&self, name: &str) -> Option<LayerSource> {
        canonical_name(name).and_then(|(canonical, _)| self.sources.get(canonical).copied())
    }

    /// Set a value from the interactive layer. An empty value clears the key.
    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<()> {
        let mut layer = Layer::new(LayerSource::Interactive);
        layer.set(name, value.clone())?;
        if value.is_empty() {
            self.unset(name);
        } else {
            self.apply(layer);
        }
        Ok(())
    }

    pub fn unset(&mut self, name: &str) {
        if let Some((canonical, _)) = canonical_name(name) {
            self.values.remove(canonical);
            self.sources.remove(canonical);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Values that came from one of the given sources, as a fresh layer.
    pub fn layer_from(&self, keep: impl Fn(LayerSource) -> bool, source: LayerSource) -> Layer {
        let mut layer = Layer::new(source);
        for (key, value) in &self.values {
            if self.sources.get(key).copied().map(&keep).unwrap_or(false) {
                layer.values.insert(key, value.clone());
            }
        }
        layer
    }

    fn string(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(OptionValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn credential(&self, name: &str) -> Option<&Credential> {
        match self.get(name) {
            Some(OptionValue::User(cred)) => Some(cred),
            _ => None,
        }
    }

    fn set_string(&mut self, name: &str, value: Option<String>) {
        match value {
            Some(v) if !v.is_empty() => {
                let _ = self.set(name, OptionValue::String(v));
            }
            _ => self.unset(name),
        }
    }

    pub fn server_url(&self) -> Option<&str> {
        self.string("serverUrl")
    }

    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.set_string("serverUrl", Some(url.into()));
    }

    pub fn user(&self) -> Option<&Credential> {
        self.credential("user")
    }

    pub fn set_user(&mut self, user: Option<Credential>) {
        match user {
            Some(cred) if !cred.name.is_empty() => {
                let _ = self.set("user", OptionValue::User(cred));
            }
            _ => self.unset("user"),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.string("name")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set_string("name", Some(name.into()));
    }

    pub fn contact(&self) -> Option<&str> {
        self.string("contact")
    }

    pub fn set_contact(&mut self, contact: impl Into<String>) {
        self.set_string("contact", Some(contact.into()));
    }

    pub fn rmake_url(&self) -> Option<&str> {
        self.string("rmakeUrl")
    }

    pub fn set_rmake_url(&mut self, url: Option<String>) {
        self.set_string("rmakeUrl", url);
    }

    pub fn rmake_user(&self) -> Option<&Credential> {
        self.credential("rmakeUser")
    }

    pub fn set_rmake_user(&mut self, user: Option<Credential>) {
        match user {
            Some(cred) if !cred.name.is_empty() => {
                let _ = self.set("rmakeUser", OptionValue::User(cred));
            }
            _ => self.unset("rmakeUser"),
        }
    }

    pub fn external_password(&self) -> bool {
        matches!(self.get("externalPassword"), Some(OptionValue::Bool(true)))
    }

    pub fn repository_map(&self) -> BTreeMap<String, String> {
        match self.get("repositoryMap") {
            Some(OptionValue::Dict(map)) => map.clone(),
            _ => BTreeMap::new(),
        }
    }

    pub fn plugin_dirs(&self) -> Vec<String> {
        match self.get("pluginDirs") {
            Some(OptionValue::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Host name of the management server, if a parseable URL is set.
    pub fn server_host(&self) -> Option<String> {
        self.server_url()
            .and_then(|url| Url::parse(url).ok())
            .and_then(|url| url.host_str().map(str::to_string))
    }

    /// The build-service URL: the explicit `rmakeUrl`, or one derived from
    /// the server host.
    pub fn effective_rmake_url(&self) -> Option<String> {
        match self.rmake_url() {
            Some(url) => Some(url.to_string()),
            None => self
                .server_host()
                .map(|host| format!("https://{}:{}", host, RMAKE_PORT)),
        }
    }

    /// Render the merged configuration as rc text for display.
    pub fn display(&self, hide_passwords: bool) -> String {
        let mut out = String::new();
        for (key, value) in &self.values {
            for line in value.display_lines(hide_passwords) {
                out.push_str(&format!("{:<25} {}\n", key, line));
            }
        }
        out
    }
}

/// Whether enough is configured to talk to the management server.
pub fn is_complete(config: &Config) -> bool {
    let has = |value: Option<&str>| value.map(|v| !v.is_empty()).unwrap_or(false);
    has(config.server_url())
        && config.user().map(|u| !u.name.is_empty()).unwrap_or(false)
        && has(config.name())
        && has(config.contact())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layer(source: LayerSource, entries: &[(&str, &str)]) -> Layer {
        let mut layer = Layer::new(source);
        for (key, value) in entries {
            layer.set_line(key, value).unwrap();
        }
        layer
    }

    #[test]
    fn test_merge_last_non_empty_wins() {
        let config = Config::merge(vec![
            layer(LayerSource::System, &[("serverUrl", "http://sys"), ("name", "Sys")]),
            layer(LayerSource::User, &[("serverUrl", "http://user")]),
            layer(LayerSource::Local, &[("name", "")]),
        ]);
        assert_eq!(config.server_url(), Some("http://user"));
        assert_eq!(config.source("serverUrl"), Some(LayerSource::User));
        // an empty value does not override
        assert_eq!(config.name(), Some("Sys"));
        assert_eq!(config.source("name"), Some(LayerSource::System));
    }

    #[test]
    fn test_interactive_set_overrides_everything() {
        let mut config = Config::merge(vec![layer(
            LayerSource::Remote,
            &[("contact", "remote@example.com")],
        )]);
        config.set_contact("me@example.com");
        assert_eq!(config.contact(), Some("me@example.com"));
        assert_eq!(config.source("contact"), Some(LayerSource::Interactive));
    }

    #[test]
    fn test_bool_false_overrides() {
        let config = Config::merge(vec![
            layer(LayerSource::System, &[("externalPassword", "True")]),
            layer(LayerSource::User, &[("externalPassword", "False")]),
        ]);
        assert!(!config.external_password());
    }

    #[test]
    fn test_parse_user_line() {
        let layer = layer(LayerSource::User, &[("user", "alice s3cret pass")]);
        assert_eq!(
            layer.get("user"),
            Some(&OptionValue::User(Credential::new(
                "alice",
                Some("s3cret pass".to_string())
            )))
        );
    }

    #[test]
    fn test_dict_and_list_accumulate() {
        let layer = layer(
            LayerSource::User,
            &[
                ("repositoryMap", "a.example.com https://a/conary/"),
                ("repositoryMap", "b.example.com https://b/conary/"),
                ("pluginDirs", "/one /two"),
                ("pluginDirs", "/three"),
            ],
        );
        match layer.get("repositoryMap") {
            Some(OptionValue::Dict(map)) => assert_eq!(map.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            layer.get("pluginDirs"),
            Some(&OptionValue::List(vec![
                "/one".to_string(),
                "/two".to_string(),
                "/three".to_string()
            ]))
        );
    }

    #[test]
    fn test_option_names_case_insensitive() {
        let layer = layer(LayerSource::User, &[("SERVERURL", "http://x")]);
        assert!(layer.get("serverUrl").is_some());
        assert_eq!(canonical_name("rmakeurl").map(|(n, _)| n), Some("rmakeUrl"));
        assert!(canonical_name("bogus").is_none());
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let mut layer = Layer::new(LayerSource::User);
        let err = layer
            .set("user", OptionValue::String("alice".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_bad_bool_rejected() {
        let mut layer = Layer::new(LayerSource::User);
        assert!(layer.set_line("externalPassword", "maybe").is_err());
    }

    #[test]
    fn test_effective_rmake_url() {
        let mut config = Config::default();
        assert_eq!(config.effective_rmake_url(), None);
        config.set_server_url("http://rbuilder.example.com/");
        assert_eq!(
            config.effective_rmake_url().as_deref(),
            Some("https://rbuilder.example.com:9999")
        );
        config.set_rmake_url(Some("https://other:9999".to_string()));
        assert_eq!(config.effective_rmake_url().as_deref(), Some("https://other:9999"));
    }

    #[test]
    fn test_display_hides_passwords() {
        let mut config = Config::default();
        config.set_user(Some(Credential::new("alice", Some("secret".to_string()))));
        let shown = config.display(true);
        assert!(shown.contains("alice <password>"));
        assert!(!shown.contains("secret"));
        assert!(config.display(false).contains("alice secret"));
    }

    #[test]
    fn test_is_complete() {
        let mut config = Config::default();
        assert!(!is_complete(&config));
        config.set_server_url("http://x");
        config.set_user(Some(Credential::new("alice", None)));
        config.set_name("Alice");
        assert!(!is_complete(&config));
        config.set_contact("alice@example.com");
        assert!(is_complete(&config));
    }

    #[test]
    fn test_set_empty_clears() {
        let mut config = Config::default();
        config.set_name("x");
        config.set_name("");
        assert_eq!(config.name(), None);
        config.set_rmake_user(Some(Credential::new("r", None)));
        config.set_rmake_user(None);
        assert!(config.rmake_user().is_none());
    }

    proptest! {
        #[test]
        fn prop_later_layers_win(
            values in proptest::collection::vec(proptest::option::of("[a-z]{0,6}"), 1..6)
        ) {
            let sources = [
                LayerSource::Default,
                LayerSource::System,
                LayerSource::User,
                LayerSource::Local,
                LayerSource::Remote,
                LayerSource::Interactive,
            ];
            let layers: Vec<Layer> = values
                .iter()
                .zip(sources.iter())
                .map(|(value, source)| {
                    let mut layer = Layer::new(*source);
                    if let Some(v) = value {
                        layer.set("name", OptionValue::String(v.clone())).unwrap();
                    }
                    layer
                })
                .collect();
            let expected = values
                .iter()
                .flatten()
                .filter(|v| !v.is_empty())
                .last()
                .cloned();
            let config = Config::merge(layers);
            prop_assert_eq!(config.name().map(str::to_string), expected);
        }
    }
}
