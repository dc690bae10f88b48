//! Configuration loading, env substitution, and validation.
//!
//! Config files: `emojilike.toml`, `emojilike.yaml`, or `emojilike.json`,
//! searched in `./` then the user config dir (`~/.config/emojilike/`).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file before parsing. Protocol parameters are never read from here.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config, set_config_dir},
    schema::{EmojilikeConfig, MetricsConfig, OneBotConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
