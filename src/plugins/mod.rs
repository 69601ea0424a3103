//! Operator-facing workflows built on the [`crate::handle::Handle`].

pub mod config;
