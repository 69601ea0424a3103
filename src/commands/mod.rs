//! # CLI Command Implementations
//!
//! One module per `rbuild` subcommand. Each holds a `clap` `Args` struct
//! and an `execute` function that builds the session and calls into the
//! `rbuild` library.

pub mod completions;
pub mod config;
pub mod images;
