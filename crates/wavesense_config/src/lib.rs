//! Configuration loading and validation for `wavesense.toml` files.
//!
//! The file has one `[harness]` table with run-wide settings and one
//! `[scenarios.<name>]` table per scenario override. Every field is optional;
//! a missing file yields the defaults.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{check_scenario_names, load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
