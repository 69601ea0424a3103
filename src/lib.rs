//! # rbuild Library
//!
//! Configuration reconciliation and server facades for the `rbuild`
//! command-line tool. rbuild drives three external systems: a package
//! repository, a build service and an rBuilder management server. This
//! library holds the parts of that work with real control flow; the
//! external systems themselves are only called.
//!
//! ## Quick Example
//!
//! ```
//! use rbuild::config::{is_complete, Config, Credential};
//!
//! let mut config = Config::default();
//! config.set_server_url("https://rbuilder.example.com/");
//! config.set_user(Some(Credential::new("jdoe", None)));
//! assert!(!is_complete(&config));
//!
//! config.set_name("Jane Doe");
//! config.set_contact("jdoe@example.com");
//! assert!(is_complete(&config));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: typed options merged from built-in
//!   defaults, `/etc/rbuildrc`, `~/.rbuildrc`, `./rbuildrc`, the server's
//!   published configuration and interactive answers, later layers winning.
//!   The writer persists the result and derives the files the repository
//!   and build clients read.
//! - **Reconciliation (`reconcile`)**: the interactive loop that settles on
//!   a server URL and working credentials.
//! - **Facades (`facade`)**: the management server (credential checks,
//!   projects, branches, builds, targets), build/job polling with bounded
//!   retries, and promotion/shadowing through the repository client.
//! - **Session (`handle`)**: owns the UI, configuration, facade and the
//!   consumer-configuration cache for one invocation.
//!
//! ## Execution Flow
//!
//! 1. **Load**: [`handle::Handle::from_environment`] merges every layer.
//! 2. **Reconcile**: when the configuration is incomplete (or on
//!    `config --ask`) the questionnaire runs and files are rewritten.
//! 3. **Act**: commands call the facades; errors surface as
//!    [`error::Error`] and only the binary turns them into exit codes.

pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod handle;
pub mod home;
pub mod plugins;
pub mod reconcile;
pub mod ui;
