//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML configuration file in
//! the platform config directory and falls back to defaults when the file
//! does not exist yet.

pub mod config;
