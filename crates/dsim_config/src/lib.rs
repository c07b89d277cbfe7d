//! Parsing and validation of `dsim.toml` run configuration files.
//!
//! The configuration controls how a simulation run is bounded (time limit,
//! delta and activation guards), whether activity is traced, and how
//! diagnostics are rendered.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_config_or_default, CONFIG_FILE_NAME};
pub use types::*;
